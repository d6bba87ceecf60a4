use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::error::CatalogError;
use super::models::{
    ErrorBody, Paging, Playlist, PlaylistResponse, PlaylistSummary, RawPlaylistEntry,
    SearchResponse, Track,
};
use crate::config::SyncConfig;
use crate::providers::CatalogProvider;

/// Upper bound on `next` links followed for one playlist.
const MAX_PLAYLIST_PAGES: usize = 50;

#[derive(Clone)]
pub struct SpotifyClient {
    client: Client,
    api_base: String,
    search_limit: u8,
}

impl SpotifyClient {
    pub fn new(config: &SyncConfig) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            api_base: config.spotify_api_base.trim_end_matches('/').to_string(),
            search_limit: config.search_limit.max(1),
        })
    }

    /// `api_base` extended by `segments`, each one percent-encoded so an id
    /// can never change the path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, CatalogError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| CatalogError::Transport(format!("Invalid API base: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| CatalogError::Transport("API base cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Ranked track candidates for `query`, as ordered by the catalog.
    pub async fn search_tracks(&self, query: &str, token: &str) -> Result<Vec<Track>, CatalogError> {
        let url = self.endpoint(&["search"])?;
        let limit = self.search_limit.to_string();

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())])
            .send()
            .await?;

        let data: SearchResponse = Self::read_json(response).await?;
        Ok(data.tracks.items)
    }

    /// First candidate for `query`, or `None` when the search is empty.
    /// No local re-ranking and no retry.
    pub async fn resolve_track(
        &self,
        query: &str,
        token: &str,
    ) -> Result<Option<Track>, CatalogError> {
        let track = self.search_tracks(query, token).await?.into_iter().next();

        match &track {
            Some(t) => log::info!("Resolved '{}' to '{}' ({})", query, t.name, t.id),
            None => log::warn!("No tracks found for query: {}", query),
        }

        Ok(track)
    }

    /// Whole playlist, following every page of its track listing.
    pub async fn fetch_playlist(
        &self,
        playlist_id: &str,
        token: &str,
    ) -> Result<Playlist, CatalogError> {
        log::info!("Fetching Spotify playlist: {}", playlist_id);

        let url = self.endpoint(&["playlists", playlist_id])?;
        let response = self.client.get(url).bearer_auth(token).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(format!("playlist {}", playlist_id)));
        }
        let data: PlaylistResponse = Self::read_json(response).await?;

        let mut entries: Vec<_> = data
            .tracks
            .items
            .into_iter()
            .map(RawPlaylistEntry::into_entry)
            .collect();

        let mut next = data.tracks.next;
        let mut pages = 1;
        while let Some(page_url) = next.take() {
            if pages >= MAX_PLAYLIST_PAGES {
                log::warn!("Playlist {} truncated after {} pages", playlist_id, pages);
                break;
            }
            let response = self.client.get(&page_url).bearer_auth(token).send().await?;
            let page: Paging<RawPlaylistEntry> = Self::read_json(response).await?;
            entries.extend(page.items.into_iter().map(RawPlaylistEntry::into_entry));
            next = page.next;
            pages += 1;
        }

        log::info!(
            "Fetched playlist '{}' with {} entries",
            data.name,
            entries.len()
        );

        Ok(Playlist {
            id: data.id,
            name: data.name,
            entries,
        })
    }

    pub async fn list_playlists(&self, token: &str) -> Result<Vec<PlaylistSummary>, CatalogError> {
        let url = self.endpoint(&["me", "playlists"])?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[("limit", "50")])
            .send()
            .await?;

        let page: Paging<PlaylistSummary> = Self::read_json(response).await?;
        Ok(page.items)
    }

    pub async fn add_track(
        &self,
        playlist_id: &str,
        track_uri: &str,
        token: &str,
    ) -> Result<(), CatalogError> {
        let url = self.endpoint(&["playlists", playlist_id, "tracks"])?;
        log::info!("Adding {} to playlist {}", track_uri, playlist_id);

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "uris": [track_uri] }))
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, CatalogError> {
        let response = Self::check_status(response).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn check_status(response: Response) -> Result<Response, CatalogError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or_else(|_| "No additional details".to_string());

        log::warn!("Request failed ({}) at {}: {}", status, url, detail);

        Err(Self::status_error(status, detail))
    }

    fn status_error(status: StatusCode, detail: String) -> CatalogError {
        if status == StatusCode::FORBIDDEN {
            CatalogError::AuthScope {
                status: status.as_u16(),
                detail,
            }
        } else {
            CatalogError::Transport(format!("HTTP {}: {}", status, detail))
        }
    }
}

#[async_trait]
impl CatalogProvider for SpotifyClient {
    async fn resolve_track(&self, query: &str, token: &str) -> Result<Option<Track>, CatalogError> {
        SpotifyClient::resolve_track(self, query, token).await
    }

    async fn fetch_playlist(&self, playlist_id: &str, token: &str) -> Result<Playlist, CatalogError> {
        SpotifyClient::fetch_playlist(self, playlist_id, token).await
    }

    async fn list_playlists(&self, token: &str) -> Result<Vec<PlaylistSummary>, CatalogError> {
        SpotifyClient::list_playlists(self, token).await
    }

    async fn add_track(
        &self,
        playlist_id: &str,
        track_uri: &str,
        token: &str,
    ) -> Result<(), CatalogError> {
        SpotifyClient::add_track(self, playlist_id, track_uri, token).await
    }
}
