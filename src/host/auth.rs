use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use super::protocol::Outbound;
use crate::providers::AuthProvider;

/// Token pushed by the extension after its OAuth flow. Logging in means
/// asking the extension to run that flow again.
pub struct SessionAuth {
    token: RwLock<Option<String>>,
    outbound: UnboundedSender<Outbound>,
}

impl SessionAuth {
    pub fn new(outbound: UnboundedSender<Outbound>) -> Arc<Self> {
        Arc::new(Self {
            token: RwLock::new(None),
            outbound,
        })
    }

    /// Store a fresh token. Returns true if this starts a session.
    pub fn set_token(&self, token: String) -> bool {
        let mut current = self.token.write();
        let started = current.is_none();
        *current = Some(token);
        started
    }
}

#[async_trait]
impl AuthProvider for SessionAuth {
    fn credential(&self) -> Option<String> {
        self.token.read().clone()
    }

    async fn login(&self) {
        log::info!("[SessionAuth] Requesting login");
        if self.outbound.send(Outbound::Login).is_err() {
            log::warn!("[SessionAuth] Host output closed, cannot request login");
        }
    }

    async fn logout(&self) {
        *self.token.write() = None;
        self.login().await;
    }
}
