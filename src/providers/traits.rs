use async_trait::async_trait;

use crate::spotify::{CatalogError, Playlist, PlaylistSummary, Track};
use crate::youtube::{LocateError, VideoRef};

/// Music catalog: search, playlist reads and playlist writes.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Best candidate for freeform text. `Ok(None)` when nothing matched.
    async fn resolve_track(&self, query: &str, token: &str) -> Result<Option<Track>, CatalogError>;

    async fn fetch_playlist(&self, playlist_id: &str, token: &str) -> Result<Playlist, CatalogError>;

    async fn list_playlists(&self, token: &str) -> Result<Vec<PlaylistSummary>, CatalogError>;

    async fn add_track(
        &self,
        playlist_id: &str,
        track_uri: &str,
        token: &str,
    ) -> Result<(), CatalogError>;
}

/// Finds a playable video for a catalog track.
#[async_trait]
pub trait VideoLocator: Send + Sync {
    async fn locate_video(&self, track: &Track) -> Result<VideoRef, LocateError>;
}

/// Token holder for the catalog session. The OAuth flow itself lives with
/// whoever implements this.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Current bearer token, if logged in.
    fn credential(&self) -> Option<String>;

    async fn login(&self);

    async fn logout(&self);
}
