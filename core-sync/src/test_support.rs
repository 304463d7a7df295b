//! Shared fixtures for unit tests

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::{
    AlbumRecord, ArtistRecord, MediaServerClient, PlaylistRecord, TrackRecord, UserItemData,
};
use mockall::mock;

mock! {
    pub MediaServer {}

    #[async_trait]
    impl MediaServerClient for MediaServer {
        async fn fetch_artists(&self) -> Result<Vec<ArtistRecord>>;
        async fn fetch_albums(&self, artist_id: Option<String>) -> Result<Vec<AlbumRecord>>;
        async fn fetch_albums_by_id(&self, album_ids: Vec<String>) -> Result<Vec<AlbumRecord>>;
        async fn fetch_tracks(&self, album_id: Option<String>) -> Result<Vec<TrackRecord>>;
        async fn fetch_playlists(&self) -> Result<Vec<PlaylistRecord>>;
        async fn fetch_playlist_items(&self, playlist_id: &str) -> Result<Vec<TrackRecord>>;
    }
}

pub fn artist_record(id: &str, name: &str) -> ArtistRecord {
    ArtistRecord {
        id: id.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn album_record(id: &str, name: &str, album_artist: Option<&str>) -> AlbumRecord {
    AlbumRecord {
        id: id.to_string(),
        name: name.to_string(),
        album_artist: album_artist.map(str::to_string),
        ..Default::default()
    }
}

pub fn track_record(id: &str, name: &str) -> TrackRecord {
    TrackRecord {
        id: id.to_string(),
        name: name.to_string(),
        run_time_ticks: Some(2_000_000_000),
        user_data: Some(UserItemData {
            play_count: Some(0),
            is_favorite: Some(false),
        }),
        ..Default::default()
    }
}

/// Track on `album_id` by `artist`, tagged with `genres`
pub fn album_track(
    id: &str,
    name: &str,
    album_id: &str,
    artist: &str,
    genres: &[&str],
) -> TrackRecord {
    TrackRecord {
        album_id: Some(album_id.to_string()),
        artists: vec![artist.to_string()],
        album_artist: Some(artist.to_string()),
        genres: genres.iter().map(|g| g.to_string()).collect(),
        ..track_record(id, name)
    }
}

pub fn playlist_record(id: &str, name: &str) -> PlaylistRecord {
    PlaylistRecord {
        id: id.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}
