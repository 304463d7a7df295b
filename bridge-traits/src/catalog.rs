//! Remote catalog contract
//!
//! Record types mirror the item DTOs returned by Jellyfin and Emby servers
//! (PascalCase JSON). The [`MediaServerClient`] trait is implemented by the host's
//! authenticated API client; transport, paging and auth headers live behind it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// Flavour of media server a Source talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerKind {
    Jellyfin,
    Emby,
}

impl ServerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerKind::Jellyfin => "jellyfin",
            ServerKind::Emby => "emby",
        }
    }
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerKind {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jellyfin" => Ok(ServerKind::Jellyfin),
            "emby" => Ok(ServerKind::Emby),
            other => Err(BridgeError::Decode(format!("Unknown server kind: {}", other))),
        }
    }
}

/// Image kind to tag map, e.g. `{"Primary": "a1b2"}`
pub type ImageTags = HashMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ArtistRecord {
    pub id: String,
    pub name: String,
    pub sort_name: Option<String>,
    pub image_tags: ImageTags,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AlbumRecord {
    pub id: String,
    pub name: String,
    pub sort_name: Option<String>,
    pub production_year: Option<i32>,
    pub album_artist: Option<String>,
    pub image_tags: ImageTags,
}

/// Per-user playback state attached to a track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserItemData {
    pub play_count: Option<i64>,
    pub is_favorite: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TrackRecord {
    pub id: String,
    pub name: String,
    pub album_id: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub artists: Vec<String>,
    /// Raw genre strings; entries may themselves be comma-joined
    pub genres: Vec<String>,
    /// Duration in 100ns ticks
    pub run_time_ticks: Option<i64>,
    pub index_number: Option<i32>,
    pub parent_index_number: Option<i32>,
    /// RFC 3339 creation date on the server
    pub date_created: Option<String>,
    pub container: Option<String>,
    pub user_data: Option<UserItemData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PlaylistRecord {
    pub id: String,
    pub name: String,
    pub overview: Option<String>,
    pub owner_user_id: Option<String>,
    pub path: Option<String>,
    pub location_type: Option<String>,
    /// Server flavour the playlist was created on; `None` means the queried server
    pub origin: Option<ServerKind>,
}

/// Paged list envelope returned by the `/Items` endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
    pub total_record_count: u64,
    pub start_index: u64,
}

/// Authenticated access to one Source's remote catalog
///
/// Every call returns the complete list for its scope; paging is resolved by
/// the implementation. Any failure aborts the whole request.
#[async_trait]
pub trait MediaServerClient: Send + Sync {
    async fn fetch_artists(&self) -> Result<Vec<ArtistRecord>>;

    /// Albums, optionally restricted to one artist
    async fn fetch_albums(&self, artist_id: Option<String>) -> Result<Vec<AlbumRecord>>;

    /// Full metadata for specific albums; unknown ids are skipped
    async fn fetch_albums_by_id(&self, album_ids: Vec<String>) -> Result<Vec<AlbumRecord>>;

    /// Tracks, optionally restricted to one album
    async fn fetch_tracks(&self, album_id: Option<String>) -> Result<Vec<TrackRecord>>;

    async fn fetch_playlists(&self) -> Result<Vec<PlaylistRecord>>;

    /// Ordered playlist entries
    async fn fetch_playlist_items(&self, playlist_id: &str) -> Result<Vec<TrackRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_record_from_server_json() {
        let json = r#"{
            "Id": "t-1",
            "Name": "Paranoid Android",
            "AlbumId": "al-1",
            "Artists": ["Radiohead"],
            "Genres": ["Alternative Rock, Art Rock"],
            "RunTimeTicks": 3830000000,
            "IndexNumber": 2,
            "UserData": { "PlayCount": 7, "IsFavorite": true },
            "Type": "Audio"
        }"#;

        let track: TrackRecord = serde_json::from_str(json).unwrap();
        assert_eq!(track.id, "t-1");
        assert_eq!(track.album_id.as_deref(), Some("al-1"));
        assert_eq!(track.run_time_ticks, Some(3_830_000_000));
        assert_eq!(track.genres, vec!["Alternative Rock, Art Rock"]);
        let user_data = track.user_data.unwrap();
        assert_eq!(user_data.play_count, Some(7));
        assert_eq!(user_data.is_favorite, Some(true));
        assert!(track.parent_index_number.is_none());
    }

    #[test]
    fn test_items_envelope() {
        let json = r#"{
            "Items": [{ "Id": "ar-1", "Name": "Björk", "ImageTags": { "Primary": "abc" } }],
            "TotalRecordCount": 1
        }"#;

        let page: ItemsResponse<ArtistRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(page.total_record_count, 1);
        assert_eq!(page.items[0].image_tags.get("Primary"), Some(&"abc".to_string()));
    }

    #[test]
    fn test_server_kind_parsing() {
        assert_eq!("Jellyfin".parse::<ServerKind>().unwrap(), ServerKind::Jellyfin);
        assert_eq!(ServerKind::Emby.to_string(), "emby");
        assert!("plex".parse::<ServerKind>().is_err());
    }
}
