use tokio::sync::oneshot;

use crate::errors::AppError;
use crate::spotify::{Playlist, PlaylistSummary, Track};
use crate::youtube::{LocateError, VideoRef};

use crate::page::Playhead;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanTrigger {
    SessionStart,
    TabUpdated,
    /// The single follow-up of a deferred scan.
    Retry,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    NotAMediaPage,
    /// Watch page still building; try once more later.
    Deferred,
    Resolved(Option<Track>),
    /// Extraction or catalog failure. Leaves state alone.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOrigin {
    User,
    AutoAdvance,
}

/// Everything the coordinator reacts to, consumed one at a time.
#[derive(Debug)]
pub enum SyncEvent {
    SessionStarted,
    TabUpdated,
    ScanDue {
        trigger: ScanTrigger,
    },
    ScanFinished {
        epoch: u64,
        trigger: ScanTrigger,
        outcome: ScanOutcome,
    },
    OpenPlaylist {
        playlist_id: String,
    },
    PlaylistLoaded {
        playlist: Playlist,
    },
    /// The catalog accepted `uri` into the playlist.
    TrackAdded {
        playlist_id: String,
        uri: String,
    },
    NavigateTo {
        index: usize,
        origin: NavigationOrigin,
    },
    VideoLocated {
        index: usize,
        track: Track,
        origin: NavigationOrigin,
        result: Result<VideoRef, LocateError>,
    },
    PlayheadSampled(Option<Playhead>),
    AdvanceCooldownElapsed,
    AddCurrentTrack {
        reply: oneshot::Sender<Result<(), AppError>>,
    },
    ListPlaylists {
        reply: oneshot::Sender<Result<Vec<PlaylistSummary>, AppError>>,
    },
    Logout,
    Shutdown,
}
