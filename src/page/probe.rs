use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::error::ExtractionError;
use super::observer::{PageObserver, Probe, Tab};

pub const WATCH_HOSTS: [&str; 3] = ["www.youtube.com", "youtube.com", "m.youtube.com"];
pub const WATCH_PATH: &str = "/watch";

pub const UNKNOWN_TITLE: &str = "Unknown Name";
pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";

/// True for http(s) YouTube single-video pages only.
pub fn is_watch_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    matches!(parsed.scheme(), "http" | "https")
        && parsed.host_str().is_some_and(|h| WATCH_HOSTS.contains(&h))
        && parsed.path() == WATCH_PATH
}

/// Best-effort text scraped from a watch page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub title: String,
    pub channel_name: String,
}

impl PageMetadata {
    fn from_probe(value: &Value) -> Self {
        let text = |key: &str, fallback: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };

        Self {
            title: text("title", UNKNOWN_TITLE),
            channel_name: text("channelName", UNKNOWN_CHANNEL),
        }
    }

    /// The channel element renders late; an unknown channel usually means
    /// the page has not finished building.
    pub fn is_incomplete(&self) -> bool {
        self.channel_name == UNKNOWN_CHANNEL
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Playhead {
    pub position_secs: f64,
    pub duration_secs: f64,
}

impl Playhead {
    fn from_probe(value: &Value) -> Option<Self> {
        let position_secs = value.get("currentTime")?.as_f64()?;
        // Duration is NaN (null on the wire) until metadata loads.
        let duration_secs = value
            .get("duration")
            .and_then(Value::as_f64)
            .filter(|d| d.is_finite())
            .unwrap_or(0.0);

        Some(Self {
            position_secs,
            duration_secs,
        })
    }

    pub fn remaining_secs(&self) -> Option<f64> {
        (self.duration_secs > 0.0).then(|| self.duration_secs - self.position_secs)
    }
}

/// Page Context Probe: watch-page detection and DOM reads over a
/// [`PageObserver`]. Never panics or propagates page failures as crashes.
#[derive(Clone)]
pub struct PageProbe {
    observer: Arc<dyn PageObserver>,
}

impl PageProbe {
    pub fn new(observer: Arc<dyn PageObserver>) -> Self {
        Self { observer }
    }

    async fn active_tab(&self) -> Option<Tab> {
        match self.observer.active_tab().await {
            Ok(tab) => tab,
            Err(e) => {
                log::debug!("[PageProbe] Active tab query failed: {}", e);
                None
            }
        }
    }

    /// Fail-closed: any error or missing tab reads as "not a watch page".
    pub async fn is_on_watch_page(&self) -> bool {
        self.active_tab()
            .await
            .and_then(|tab| tab.url)
            .is_some_and(|url| is_watch_url(&url))
    }

    pub async fn extract_page_metadata(&self) -> Result<PageMetadata, ExtractionError> {
        let tab = self.active_tab().await.ok_or(ExtractionError::NoActiveTab)?;

        let value = self
            .observer
            .inject(tab.id, Probe::PageMetadata)
            .await
            .map_err(|e| ExtractionError::ProbeFailed(e.to_string()))?
            .ok_or(ExtractionError::NoResult)?;

        Ok(PageMetadata::from_probe(&value))
    }

    /// Current playhead, or `None` on any failure or when the active tab is
    /// not a watch page.
    pub async fn sample_playhead(&self) -> Option<Playhead> {
        let tab = self.active_tab().await?;
        if !tab.url.as_deref().is_some_and(is_watch_url) {
            return None;
        }

        match self.observer.inject(tab.id, Probe::Playhead).await {
            Ok(Some(value)) => Playhead::from_probe(&value),
            Ok(None) => {
                log::debug!("[PageProbe] No video element in tab {}", tab.id);
                None
            }
            Err(e) => {
                log::debug!("[PageProbe] Playhead probe failed: {}", e);
                None
            }
        }
    }

    /// Point the active tab at `url`.
    pub async fn navigate(&self, url: &str) -> Result<(), ExtractionError> {
        let tab = self.active_tab().await.ok_or(ExtractionError::NoActiveTab)?;
        self.observer
            .navigate(tab.id, url)
            .await
            .map_err(|e| ExtractionError::ProbeFailed(e.to_string()))
    }
}
