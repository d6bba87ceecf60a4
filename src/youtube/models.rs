use serde::{Deserialize, Serialize};

pub const WATCH_URL: &str = "https://www.youtube.com/watch";

/// A playable video matched to a catalog track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRef {
    pub video_id: String,
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl VideoRef {
    pub fn new(video_id: impl Into<String>, thumbnail: Option<String>) -> Self {
        let video_id = video_id.into();
        Self {
            href: format!("{}?v={}", WATCH_URL, video_id),
            video_id,
            thumbnail,
        }
    }
}

// Wire shapes of the search endpoint

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub struct SearchItem {
    pub id: ItemId,
    #[serde(default)]
    pub snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemId {
    #[serde(default)]
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Snippet {
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
pub struct Thumbnails {
    #[serde(default)]
    pub default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

impl SearchItem {
    pub fn into_video(self) -> Option<VideoRef> {
        let video_id = self.id.video_id?;
        let thumbnail = self
            .snippet
            .and_then(|s| s.thumbnails.default)
            .map(|t| t.url);
        Some(VideoRef::new(video_id, thumbnail))
    }
}
