use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub images: Vec<Image>,
}

/// A catalog track. Replaced wholesale, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Empty for local files, which the catalog reports without an id.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Album,
    #[serde(default, deserialize_with = "null_as_default")]
    pub uri: String,
}

impl Track {
    /// Smallest album image; the catalog orders images largest first.
    pub fn thumbnail(&self) -> Option<&Image> {
        self.album.images.last()
    }

    pub fn artist_names(&self) -> Vec<&str> {
        self.artists.iter().map(|a| a.name.as_str()).collect()
    }
}

/// A playlist slot. The track is absent when it is unavailable to the
/// account or region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    #[serde(default)]
    pub track: Option<Track>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub entries: Vec<PlaylistEntry>,
}

impl Playlist {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn track_at(&self, index: usize) -> Option<&Track> {
        self.entries.get(index)?.track.as_ref()
    }

    /// Position of `track`: first identifier match, otherwise first exact
    /// name match.
    pub fn position_of(&self, track: &Track) -> Option<usize> {
        let tracks = || self.entries.iter().map(|e| e.track.as_ref());

        if !track.id.is_empty() {
            if let Some(idx) = tracks().position(|t| t.is_some_and(|t| t.id == track.id)) {
                return Some(idx);
            }
        }

        tracks().position(|t| t.is_some_and(|t| t.name == track.name))
    }
}

/// Entry in the user's playlist listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<Image>,
    #[serde(default)]
    pub tracks: Option<TrackCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackCount {
    pub total: u32,
}

// Wire shapes

#[derive(Debug, Deserialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub tracks: Paging<Track>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistResponse {
    pub id: String,
    pub name: String,
    pub tracks: Paging<RawPlaylistEntry>,
}

/// Playlist items may hold podcast episodes, which lack track fields.
#[derive(Debug, Deserialize)]
pub struct RawPlaylistEntry {
    #[serde(default)]
    pub track: Option<serde_json::Value>,
}

impl RawPlaylistEntry {
    pub fn into_entry(self) -> PlaylistEntry {
        let track = self
            .track
            .filter(|t| t.get("type").and_then(|v| v.as_str()).unwrap_or("track") == "track")
            .and_then(|t| serde_json::from_value::<Track>(t).ok());
        PlaylistEntry { track }
    }
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn track(id: &str, name: &str) -> Track {
        Track {
            id: id.to_string(),
            name: name.to_string(),
            artists: vec![],
            album: Album::default(),
            uri: format!("spotify:track:{}", id),
        }
    }

    fn playlist(tracks: Vec<Option<Track>>) -> Playlist {
        Playlist {
            id: "p".to_string(),
            name: "Mix".to_string(),
            entries: tracks.into_iter().map(|track| PlaylistEntry { track }).collect(),
        }
    }

    #[test]
    fn test_position_prefers_id_over_earlier_name_match() {
        let p = playlist(vec![
            Some(track("a", "Song")),
            None,
            Some(track("b", "Song")),
        ]);

        assert_eq!(p.position_of(&track("b", "Song")), Some(2));
    }

    #[test]
    fn test_position_falls_back_to_name() {
        let p = playlist(vec![Some(track("a", "One")), Some(track("b", "Two"))]);

        assert_eq!(p.position_of(&track("other-id", "Two")), Some(1));
        assert_eq!(p.position_of(&track("zzz", "Three")), None);
    }

    #[test]
    fn test_position_skips_unavailable_entries() {
        let p = playlist(vec![None, None]);
        assert_eq!(p.position_of(&track("a", "One")), None);
    }

    #[test]
    fn test_parse_search_response() {
        let body = json!({
            "tracks": {
                "items": [{
                    "id": "4iV5W9uYEdYUVa79Axb7Rh",
                    "name": "California Gurls",
                    "uri": "spotify:track:4iV5W9uYEdYUVa79Axb7Rh",
                    "artists": [{ "name": "Katy Perry" }, { "name": "Snoop Dogg" }],
                    "album": { "images": [
                        { "url": "https://i.scdn.co/640", "width": 640, "height": 640 },
                        { "url": "https://i.scdn.co/64", "width": 64, "height": 64 }
                    ]}
                }],
                "next": null
            }
        });

        let parsed: SearchResponse = serde_json::from_value(body).unwrap();
        let t = &parsed.tracks.items[0];
        assert_eq!(t.artist_names(), vec!["Katy Perry", "Snoop Dogg"]);
        assert_eq!(t.thumbnail().unwrap().width, Some(64));
    }

    #[test]
    fn test_episode_entries_become_unavailable() {
        let raw: RawPlaylistEntry = serde_json::from_value(json!({
            "track": { "type": "episode", "id": "e1", "name": "Pod" }
        }))
        .unwrap();
        assert_eq!(raw.into_entry().track, None);

        let raw: RawPlaylistEntry = serde_json::from_value(json!({ "track": null })).unwrap();
        assert_eq!(raw.into_entry().track, None);
    }

    #[test]
    fn test_local_file_entry_stays_playable() {
        let raw: RawPlaylistEntry = serde_json::from_value(json!({
            "track": {
                "type": "track",
                "id": null,
                "name": "My Local Song",
                "uri": "spotify:local:Someone::My+Local+Song:215",
                "artists": [{ "name": "Someone" }],
                "album": { "images": [] }
            }
        }))
        .unwrap();

        let entry = raw.into_entry();
        let local = entry.track.as_ref().unwrap();
        assert_eq!(local.id, "");
        assert_eq!(local.name, "My Local Song");

        let p = Playlist {
            id: "p".to_string(),
            name: "Mix".to_string(),
            entries: vec![PlaylistEntry { track: None }, entry],
        };
        assert_eq!(p.position_of(&track("catalog-id", "My Local Song")), Some(1));
    }

    #[test]
    fn test_null_uri_and_images_read_as_empty() {
        let t: Track = serde_json::from_value(json!({
            "id": null, "name": "X", "uri": null
        }))
        .unwrap();
        assert_eq!(t.uri, "");

        let s: PlaylistSummary = serde_json::from_value(json!({
            "id": "p", "name": "Mix", "images": null
        }))
        .unwrap();
        assert!(s.images.is_empty());
    }
}
