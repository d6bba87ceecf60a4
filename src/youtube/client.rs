use async_trait::async_trait;
use reqwest::Client;

use super::error::LocateError;
use super::models::{SearchResponse, VideoRef};
use crate::config::SyncConfig;
use crate::providers::VideoLocator;
use crate::spotify::Track;

/// Search text for a track's video: the track name plus the second artist
/// when there is one, otherwise the first.
pub fn build_search_query(track: &Track) -> String {
    let artist = track
        .artists
        .get(1)
        .or_else(|| track.artists.first())
        .map(|a| a.name.as_str());

    match artist {
        Some(artist) => format!("{} by {}", track.name, artist),
        None => track.name.clone(),
    }
}

#[derive(Clone)]
pub struct YoutubeClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
}

impl YoutubeClient {
    pub fn new(config: &SyncConfig) -> Result<Self, LocateError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        if config.youtube_api_key.is_none() {
            log::warn!("No YouTube API key configured; playlist navigation will not work");
        }

        Ok(Self {
            client,
            api_base: config.youtube_api_base.trim_end_matches('/').to_string(),
            api_key: config.youtube_api_key.clone(),
        })
    }

    /// First search result for the track. Failures come back as values.
    pub async fn locate_video(&self, track: &Track) -> Result<VideoRef, LocateError> {
        let api_key = self.api_key.as_deref().ok_or(LocateError::MissingApiKey)?;
        let query = build_search_query(track);
        let url = format!("{}/search", self.api_base);

        log::debug!("Searching YouTube for: {}", query);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("part", "snippet"),
                ("q", query.as_str()),
                ("type", "video"),
                ("maxResults", "1"),
                ("key", api_key),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("YouTube search failed ({}) for '{}'", status, query);
            return Err(LocateError::Transport(format!("HTTP {}", status)));
        }

        let data: SearchResponse = response.json().await?;
        let video = data
            .items
            .into_iter()
            .next()
            .and_then(|item| item.into_video())
            .ok_or_else(|| LocateError::NoResults(query.clone()))?;

        log::info!("Located video {} for '{}'", video.video_id, query);
        Ok(video)
    }
}

#[async_trait]
impl VideoLocator for YoutubeClient {
    async fn locate_video(&self, track: &Track) -> Result<VideoRef, LocateError> {
        YoutubeClient::locate_video(self, track).await
    }
}
