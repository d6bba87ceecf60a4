//! Page-control capability.
//!
//! The sync core never talks to a browser API directly. Whatever hosts it
//! (the native-messaging bridge, a test double) implements [`PageObserver`]
//! and answers three questions: which tab is active, go to this URL, and run
//! this probe against the page.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub type TabId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    #[serde(default)]
    pub url: Option<String>,
}

/// DOM reads the core knows how to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Probe {
    /// `{ title, channelName }` text of the watch page.
    PageMetadata,
    /// `{ currentTime, duration }` of the main video element.
    Playhead,
}

impl Probe {
    /// Field name to CSS selector pairs the injected script reads.
    pub fn selectors(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Probe::PageMetadata => &[
                ("title", "#title h1 .ytd-watch-metadata"),
                ("channelName", "#channel-name a"),
            ],
            Probe::Playhead => &[("video", "video.html5-main-video")],
        }
    }
}

#[async_trait]
pub trait PageObserver: Send + Sync {
    /// Active tab of the focused window, if any.
    async fn active_tab(&self) -> Result<Option<Tab>>;

    async fn navigate(&self, tab_id: TabId, url: &str) -> Result<()>;

    /// Run `probe` in the tab. `Ok(None)` when the page had nothing to report.
    async fn inject(&self, tab_id: TabId, probe: Probe) -> Result<Option<serde_json::Value>>;
}
