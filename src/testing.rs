//! Test doubles for the collaborator traits.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::page::{PageObserver, Probe, Tab};
use crate::page::observer::TabId;
use crate::providers::{AuthProvider, CatalogProvider, VideoLocator};
use crate::spotify::{Album, Artist, CatalogError, Playlist, PlaylistEntry, PlaylistSummary, Track};
use crate::youtube::{LocateError, VideoRef};

pub fn track(id: &str, name: &str) -> Track {
    Track {
        id: id.to_string(),
        name: name.to_string(),
        artists: vec![Artist {
            name: format!("{} artist", name),
        }],
        album: Album::default(),
        uri: format!("spotify:track:{}", id),
    }
}

pub fn playlist(id: &str, tracks: Vec<Option<Track>>) -> Playlist {
    Playlist {
        id: id.to_string(),
        name: format!("Playlist {}", id),
        entries: tracks.into_iter().map(|track| PlaylistEntry { track }).collect(),
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

#[derive(Default)]
struct PageState {
    tab_open: bool,
    url: Option<String>,
    title: Option<String>,
    channel: Option<String>,
    playhead: Option<(f64, f64)>,
    fail_queries: bool,
    navigations: Vec<String>,
    metadata_probes: usize,
}

/// Scriptable browser tab.
pub struct FakePage {
    state: Mutex<PageState>,
}

impl FakePage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PageState {
                tab_open: true,
                ..PageState::default()
            }),
        })
    }

    pub fn set_url(&self, url: &str) {
        self.state.lock().url = Some(url.to_string());
    }

    pub fn close_tab(&self) {
        self.state.lock().tab_open = false;
    }

    pub fn fail_queries(&self, fail: bool) {
        self.state.lock().fail_queries = fail;
    }

    /// Watch page showing `title` by `channel`; `None` channel mimics a page
    /// whose channel element has not rendered yet.
    pub fn show_video(&self, title: &str, channel: Option<&str>) {
        let mut state = self.state.lock();
        state.url = Some(watch_url("current"));
        state.title = Some(title.to_string());
        state.channel = channel.map(str::to_string);
    }

    pub fn set_playhead(&self, position: f64, duration: f64) {
        self.state.lock().playhead = Some((position, duration));
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().navigations.clone()
    }

    pub fn metadata_probes(&self) -> usize {
        self.state.lock().metadata_probes
    }
}

#[async_trait]
impl PageObserver for FakePage {
    async fn active_tab(&self) -> Result<Option<Tab>> {
        let state = self.state.lock();
        if state.fail_queries {
            return Err(anyhow!("tabs API unavailable"));
        }
        Ok(state.tab_open.then(|| Tab {
            id: 7,
            url: state.url.clone(),
        }))
    }

    async fn navigate(&self, _tab_id: TabId, url: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.navigations.push(url.to_string());
        state.url = Some(url.to_string());
        Ok(())
    }

    async fn inject(&self, _tab_id: TabId, probe: Probe) -> Result<Option<Value>> {
        let mut state = self.state.lock();
        match probe {
            Probe::PageMetadata => {
                state.metadata_probes += 1;
                Ok(Some(json!({
                    "title": state.title,
                    "channelName": state.channel,
                })))
            }
            Probe::Playhead => Ok(state
                .playhead
                .map(|(p, d)| json!({ "currentTime": p, "duration": d }))),
        }
    }
}

#[derive(Default)]
struct CatalogState {
    results: HashMap<String, Track>,
    playlists: HashMap<String, Playlist>,
    add_forbidden: bool,
    resolve_delay: Option<Duration>,
    fetch_delays: HashMap<String, Duration>,
    fetch_failing: bool,
    added: Vec<(String, String)>,
}

pub struct FakeCatalog {
    state: Mutex<CatalogState>,
}

impl FakeCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(CatalogState::default()),
        })
    }

    pub fn answer(&self, query: &str, track: Track) {
        self.state.lock().results.insert(query.to_string(), track);
    }

    pub fn store_playlist(&self, playlist: Playlist) {
        self.state.lock().playlists.insert(playlist.id.clone(), playlist);
    }

    pub fn forbid_adds(&self) {
        self.state.lock().add_forbidden = true;
    }

    pub fn delay_resolves(&self, delay: Duration) {
        self.state.lock().resolve_delay = Some(delay);
    }

    /// Hold back loads of `playlist_id` by `delay`.
    pub fn delay_playlist(&self, playlist_id: &str, delay: Duration) {
        self.state
            .lock()
            .fetch_delays
            .insert(playlist_id.to_string(), delay);
    }

    pub fn fail_fetches(&self) {
        self.state.lock().fetch_failing = true;
    }

    pub fn added(&self) -> Vec<(String, String)> {
        self.state.lock().added.clone()
    }
}

#[async_trait]
impl CatalogProvider for FakeCatalog {
    async fn resolve_track(&self, query: &str, _token: &str) -> Result<Option<Track>, CatalogError> {
        let delay = self.state.lock().resolve_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.state.lock().results.get(query).cloned())
    }

    async fn fetch_playlist(&self, playlist_id: &str, _token: &str) -> Result<Playlist, CatalogError> {
        let (delay, failing) = {
            let state = self.state.lock();
            (state.fetch_delays.get(playlist_id).copied(), state.fetch_failing)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(CatalogError::Transport("HTTP 502: Bad gateway".to_string()));
        }
        self.state
            .lock()
            .playlists
            .get(playlist_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(playlist_id.to_string()))
    }

    async fn list_playlists(&self, _token: &str) -> Result<Vec<PlaylistSummary>, CatalogError> {
        Ok(self
            .state
            .lock()
            .playlists
            .values()
            .map(|p| PlaylistSummary {
                id: p.id.clone(),
                name: p.name.clone(),
                images: vec![],
                tracks: None,
            })
            .collect())
    }

    async fn add_track(
        &self,
        playlist_id: &str,
        track_uri: &str,
        _token: &str,
    ) -> Result<(), CatalogError> {
        let mut state = self.state.lock();
        if state.add_forbidden {
            return Err(CatalogError::AuthScope {
                status: 403,
                detail: "Insufficient client scope".to_string(),
            });
        }
        state
            .added
            .push((playlist_id.to_string(), track_uri.to_string()));

        // Mirror the server: the track is now the last entry.
        let added = state
            .results
            .values()
            .find(|t| t.uri == track_uri)
            .cloned();
        if let Some(playlist) = state.playlists.get_mut(playlist_id) {
            playlist.entries.push(PlaylistEntry { track: added });
        }
        Ok(())
    }
}

/// Videos are "found" for every track id except the ones marked missing.
pub struct FakeLocator {
    missing: Mutex<Vec<String>>,
    lookups: Mutex<usize>,
    delay: Mutex<Option<Duration>>,
}

impl FakeLocator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            missing: Mutex::new(Vec::new()),
            lookups: Mutex::new(0),
            delay: Mutex::new(None),
        })
    }

    pub fn hide(&self, track_id: &str) {
        self.missing.lock().push(track_id.to_string());
    }

    pub fn delay_lookups(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn lookups(&self) -> usize {
        *self.lookups.lock()
    }
}

#[async_trait]
impl VideoLocator for FakeLocator {
    async fn locate_video(&self, track: &Track) -> Result<VideoRef, LocateError> {
        *self.lookups.lock() += 1;
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.missing.lock().contains(&track.id) {
            return Err(LocateError::NoResults(track.name.clone()));
        }
        Ok(VideoRef::new(format!("v-{}", track.id), None))
    }
}

pub struct FakeAuth {
    token: Mutex<Option<String>>,
    logins: Mutex<usize>,
}

impl FakeAuth {
    pub fn logged_in() -> Arc<Self> {
        Arc::new(Self {
            token: Mutex::new(Some("token".to_string())),
            logins: Mutex::new(0),
        })
    }

    pub fn logins(&self) -> usize {
        *self.logins.lock()
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    fn credential(&self) -> Option<String> {
        self.token.lock().clone()
    }

    async fn login(&self) {
        *self.logins.lock() += 1;
    }

    async fn logout(&self) {
        *self.token.lock() = None;
        self.login().await;
    }
}
