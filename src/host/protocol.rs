use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::page::observer::TabId;
use crate::page::Probe;
use crate::spotify::{Playlist, PlaylistEntry, PlaylistSummary};
use crate::sync::SyncSnapshot;

/// Messages from the extension.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Inbound {
    /// A tab changed. Only `status == "complete"` starts a scan.
    TabUpdated {
        #[serde(default)]
        status: Option<String>,
    },
    /// OAuth finished in the extension.
    Token { token: String },
    Logout,
    OpenPlaylist { id: String },
    Navigate { index: usize },
    AddTrack { request_id: u64 },
    ListPlaylists { request_id: u64 },
    /// Answer to an outbound [`Outbound::Request`].
    Response {
        id: u64,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        error: Option<String>,
    },
}

impl Inbound {
    pub fn is_load_complete(&self) -> bool {
        matches!(self, Inbound::TabUpdated { status: Some(s) } if s == "complete")
    }
}

/// Browser calls the host asks the extension to perform.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PageCall {
    QueryActiveTab,
    NavigateTab {
        tab_id: TabId,
        url: String,
    },
    InjectProbe {
        tab_id: TabId,
        probe: Probe,
        selectors: Vec<(String, String)>,
    },
}

impl PageCall {
    pub fn inject(tab_id: TabId, probe: Probe) -> Self {
        PageCall::InjectProbe {
            tab_id,
            probe,
            selectors: probe
                .selectors()
                .iter()
                .map(|(field, selector)| (field.to_string(), selector.to_string()))
                .collect(),
        }
    }
}

/// Messages to the extension.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Outbound {
    Request {
        id: u64,
        call: PageCall,
    },
    State {
        snapshot: SyncSnapshot,
    },
    /// A slice of the current playlist, sent whenever the playlist changes.
    PlaylistEntries {
        playlist_id: String,
        offset: usize,
        total: usize,
        entries: Vec<PlaylistEntry>,
    },
    /// Start the OAuth flow.
    Login,
    Reply {
        request_id: u64,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<AppError>,
        #[serde(skip_serializing_if = "Option::is_none")]
        playlists: Option<Vec<PlaylistSummary>>,
    },
}

/// Entries per `PlaylistEntries` message, far below the outbound frame limit.
pub const PLAYLIST_CHUNK_ENTRIES: usize = 100;

impl Outbound {
    /// The playlist as consecutive chunks. An empty playlist still yields
    /// one message so the extension learns `total == 0`.
    pub fn playlist_chunks(playlist: &Playlist) -> Vec<Self> {
        let total = playlist.len();
        if total == 0 {
            return vec![Outbound::PlaylistEntries {
                playlist_id: playlist.id.clone(),
                offset: 0,
                total,
                entries: Vec::new(),
            }];
        }

        playlist
            .entries
            .chunks(PLAYLIST_CHUNK_ENTRIES)
            .enumerate()
            .map(|(i, chunk)| Outbound::PlaylistEntries {
                playlist_id: playlist.id.clone(),
                offset: i * PLAYLIST_CHUNK_ENTRIES,
                total,
                entries: chunk.to_vec(),
            })
            .collect()
    }

    pub fn reply(request_id: u64, result: Result<(), AppError>) -> Self {
        Self::reply_with(request_id, result.map(|_| None))
    }

    pub fn playlists(request_id: u64, result: Result<Vec<PlaylistSummary>, AppError>) -> Self {
        Self::reply_with(request_id, result.map(Some))
    }

    fn reply_with(
        request_id: u64,
        result: Result<Option<Vec<PlaylistSummary>>, AppError>,
    ) -> Self {
        match result {
            Ok(playlists) => Outbound::Reply {
                request_id,
                ok: true,
                error: None,
                playlists,
            },
            Err(e) => Outbound::Reply {
                request_id,
                ok: false,
                error: Some(e),
                playlists: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_inbound() {
        let msg: Inbound =
            serde_json::from_value(json!({"type": "tabUpdated", "status": "complete"})).unwrap();
        assert!(msg.is_load_complete());

        let msg: Inbound =
            serde_json::from_value(json!({"type": "tabUpdated", "status": "loading"})).unwrap();
        assert!(!msg.is_load_complete());

        let msg: Inbound =
            serde_json::from_value(json!({"type": "addTrack", "requestId": 4})).unwrap();
        assert_eq!(msg, Inbound::AddTrack { request_id: 4 });

        let msg: Inbound = serde_json::from_value(json!({"type": "response", "id": 9})).unwrap();
        assert_eq!(
            msg,
            Inbound::Response {
                id: 9,
                result: None,
                error: None
            }
        );
    }

    #[test]
    fn test_request_shape() {
        let value = serde_json::to_value(Outbound::Request {
            id: 3,
            call: PageCall::inject(12, Probe::Playhead),
        })
        .unwrap();

        assert_eq!(value["type"], "request");
        assert_eq!(value["call"]["method"], "injectProbe");
        assert_eq!(value["call"]["tabId"], 12);
        assert_eq!(value["call"]["probe"], "playhead");
        assert_eq!(value["call"]["selectors"][0][1], "video.html5-main-video");
    }

    #[test]
    fn test_reply_shape() {
        let ok = serde_json::to_value(Outbound::reply(1, Ok(()))).unwrap();
        assert_eq!(ok, json!({"type": "reply", "requestId": 1, "ok": true}));

        let listed = serde_json::to_value(Outbound::playlists(5, Ok(vec![]))).unwrap();
        assert_eq!(listed["playlists"], json!([]));

        let err = serde_json::to_value(Outbound::reply(
            2,
            Err(AppError::NotFound("gone".to_string())),
        ))
        .unwrap();
        assert_eq!(err["ok"], false);
        assert_eq!(err["error"]["type"], "NotFound");
    }

    #[test]
    fn test_playlist_chunks_cover_every_entry() {
        let playlist = Playlist {
            id: "p".to_string(),
            name: "Mix".to_string(),
            entries: vec![PlaylistEntry { track: None }; 250],
        };

        let chunks = Outbound::playlist_chunks(&playlist);
        assert_eq!(chunks.len(), 3);
        match &chunks[2] {
            Outbound::PlaylistEntries {
                offset,
                total,
                entries,
                ..
            } => {
                assert_eq!(*offset, 200);
                assert_eq!(*total, 250);
                assert_eq!(entries.len(), 50);
            }
            other => panic!("unexpected {:?}", other),
        }

        let empty = Playlist {
            entries: vec![],
            ..playlist
        };
        assert_eq!(Outbound::playlist_chunks(&empty).len(), 1);
    }
}
