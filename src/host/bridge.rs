use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc::UnboundedSender, oneshot};

use super::protocol::{Outbound, PageCall};
use crate::page::observer::TabId;
use crate::page::{PageObserver, Probe, Tab};

type Pending = Mutex<HashMap<u64, oneshot::Sender<Result<Option<Value>, String>>>>;

/// [`PageObserver`] that forwards every call to the extension as a request
/// and waits for the matching response.
pub struct HostBridge {
    outbound: UnboundedSender<Outbound>,
    pending: Pending,
    next_id: AtomicU64,
    timeout: Duration,
}

impl HostBridge {
    pub fn new(outbound: UnboundedSender<Outbound>, timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            outbound,
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            timeout,
        })
    }

    /// Route a response from the extension to whoever is waiting on it.
    pub fn complete(&self, id: u64, result: Result<Option<Value>, String>) {
        match self.pending.lock().remove(&id) {
            Some(waiter) => {
                let _ = waiter.send(result);
            }
            None => log::debug!("[HostBridge] Response {} has no waiter", id),
        }
    }

    /// Fail every outstanding call, used when the extension disconnects.
    pub fn fail_all(&self) {
        for (_, waiter) in self.pending.lock().drain() {
            let _ = waiter.send(Err("Extension disconnected".to_string()));
        }
    }

    async fn call(&self, call: PageCall) -> Result<Option<Value>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        if self.outbound.send(Outbound::Request { id, call }).is_err() {
            self.pending.lock().remove(&id);
            return Err(anyhow!("Host output closed"));
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(message))) => Err(anyhow!(message)),
            Ok(Err(_)) => Err(anyhow!("Request {} dropped", id)),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(anyhow!("Request {} timed out", id))
            }
        }
    }
}

#[async_trait]
impl PageObserver for HostBridge {
    async fn active_tab(&self) -> Result<Option<Tab>> {
        match self.call(PageCall::QueryActiveTab).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn navigate(&self, tab_id: TabId, url: &str) -> Result<()> {
        self.call(PageCall::NavigateTab {
            tab_id,
            url: url.to_string(),
        })
        .await?;
        Ok(())
    }

    async fn inject(&self, tab_id: TabId, probe: Probe) -> Result<Option<Value>> {
        self.call(PageCall::inject(tab_id, probe)).await
    }
}
