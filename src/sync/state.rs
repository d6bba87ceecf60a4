use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::spotify::{Playlist, Track};

/// Wire value of the index when the track is not in the playlist.
pub const NOT_FOUND: i64 = -1;

/// Position of `track` in `playlist`. The only way an index is derived.
pub fn compute_index(playlist: Option<&Playlist>, track: Option<&Track>) -> Option<usize> {
    playlist?.position_of(track?)
}

/// State owned by the coordinator. Mutated only through the methods below so
/// the index always matches the (playlist, track) pair.
#[derive(Debug, Default)]
pub struct SyncState {
    current_track: Option<Track>,
    current_playlist: Option<Arc<Playlist>>,
    current_index: Option<usize>,
    override_until: Option<Instant>,
    position_secs: f64,
    duration_secs: f64,
    /// URI of a track explicitly added to the current playlist.
    added_uri: Option<String>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_track.as_ref()
    }

    pub fn current_playlist(&self) -> Option<&Arc<Playlist>> {
        self.current_playlist.as_ref()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn position_secs(&self) -> f64 {
        self.position_secs
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Replace the current track and recompute its index.
    pub fn set_track(&mut self, track: Option<Track>) {
        if self.current_track.as_ref().map(|t| &t.uri) != track.as_ref().map(|t| &t.uri) {
            self.added_uri = None;
        }
        self.current_track = track;
        if self.current_track.is_none() {
            self.position_secs = 0.0;
            self.duration_secs = 0.0;
        }
        self.recompute_index();
    }

    /// Navigation from the playlist itself: the pairing is already known.
    pub fn set_track_at(&mut self, index: usize, track: Track) {
        if self.current_track.as_ref().map(|t| &t.uri) != Some(&track.uri) {
            self.added_uri = None;
        }
        self.current_track = Some(track);
        self.current_index = Some(index);
    }

    pub fn set_playlist(&mut self, playlist: Option<Playlist>) {
        let same_playlist = match (&self.current_playlist, &playlist) {
            (Some(old), Some(new)) => old.id == new.id,
            _ => false,
        };
        if !same_playlist {
            self.added_uri = None;
        }
        self.current_playlist = playlist.map(Arc::new);
        self.recompute_index();
    }

    fn recompute_index(&mut self) {
        self.current_index = compute_index(
            self.current_playlist.as_deref(),
            self.current_track.as_ref(),
        );
    }

    pub fn mark_added(&mut self, uri: &str) {
        if self.current_track.as_ref().is_some_and(|t| t.uri == uri) {
            self.added_uri = Some(uri.to_string());
        }
    }

    /// In the playlist, or explicitly added to it.
    pub fn is_added(&self) -> bool {
        self.current_index.is_some()
            || match (&self.current_track, &self.added_uri) {
                (Some(track), Some(uri)) => &track.uri == uri,
                _ => false,
            }
    }

    pub fn record_playhead(&mut self, position_secs: f64, duration_secs: Option<f64>) {
        self.position_secs = position_secs;
        if let Some(duration) = duration_secs {
            self.duration_secs = duration;
        }
    }

    pub fn begin_manual_override(&mut self, now: Instant, window: Duration) {
        self.override_until = Some(now + window);
    }

    /// True on `[start, start + window)`.
    pub fn manual_override_active(&self, now: Instant) -> bool {
        self.override_until.is_some_and(|until| now < until)
    }

    pub fn snapshot(&self, now: Instant, scanning_enabled: bool) -> SyncSnapshot {
        SyncSnapshot {
            current_track: self.current_track.clone(),
            playlist: self.current_playlist.clone(),
            current_index: self
                .current_index
                .map(|i| i as i64)
                .unwrap_or(NOT_FOUND),
            position_secs: self.position_secs,
            duration_secs: self.duration_secs,
            manual_override: self.manual_override_active(now),
            added: self.is_added(),
            scanning_enabled,
        }
    }
}

/// What the UI sees, published after every processed event. On the wire the
/// playlist is reduced to its header; entries travel separately.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSnapshot {
    pub current_track: Option<Track>,
    #[serde(serialize_with = "playlist_header")]
    pub playlist: Option<Arc<Playlist>>,
    pub current_index: i64,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub manual_override: bool,
    pub added: bool,
    pub scanning_enabled: bool,
}

#[derive(Serialize)]
struct PlaylistHeader<'a> {
    id: &'a str,
    name: &'a str,
    length: usize,
}

fn playlist_header<S: Serializer>(
    playlist: &Option<Arc<Playlist>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    playlist
        .as_deref()
        .map(|p| PlaylistHeader {
            id: &p.id,
            name: &p.name,
            length: p.len(),
        })
        .serialize(serializer)
}

impl Default for SyncSnapshot {
    fn default() -> Self {
        Self {
            current_track: None,
            playlist: None,
            current_index: NOT_FOUND,
            position_secs: 0.0,
            duration_secs: 0.0,
            manual_override: false,
            added: false,
            scanning_enabled: false,
        }
    }
}
