//! Shared fakes for the sync integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{
    AlbumRecord, ArtistRecord, FixedClock, MediaServerClient, OfflineCacheCleaner,
    PlaylistRecord, RemovedTrack, ServerKind, TrackRecord, UserItemData,
};
use core_library::db::{create_pool, create_test_pool, insert_test_source, DatabaseConfig};
use core_library::{Artist, LibraryTransaction, Source};
use core_runtime::config::CoreConfig;
use core_runtime::events::EventBus;
use core_sync::{ClientRegistry, IncrementalMetadataSync, SyncCoordinator};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{Mutex as AsyncMutex, Notify, Semaphore};

// ============================================================================
// Fake media server
// ============================================================================

#[derive(Default)]
struct Catalog {
    artists: Vec<ArtistRecord>,
    albums: Vec<AlbumRecord>,
    tracks: Vec<TrackRecord>,
    playlists: Vec<PlaylistRecord>,
    playlist_items: HashMap<String, Vec<String>>,
}

/// In-memory media server whose catalog tests edit between syncs
#[derive(Default)]
pub struct FakeServer {
    catalog: AsyncMutex<Catalog>,
    /// When set, `fetch_tracks` waits for a permit before answering
    track_gate: AsyncMutex<Option<Arc<Semaphore>>>,
    /// Signalled when `fetch_tracks` starts
    pub tracks_requested: Notify,
    fail_playlists: AsyncMutex<bool>,
    /// When set, `fetch_albums_by_id` commits an artist for this Source first
    album_lookup_writer: AsyncMutex<Option<(SqlitePool, String)>>,
}

impl FakeServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn set_artists(&self, artists: Vec<ArtistRecord>) {
        self.catalog.lock().await.artists = artists;
    }

    pub async fn set_albums(&self, albums: Vec<AlbumRecord>) {
        self.catalog.lock().await.albums = albums;
    }

    pub async fn set_tracks(&self, tracks: Vec<TrackRecord>) {
        self.catalog.lock().await.tracks = tracks;
    }

    pub async fn set_playlists(&self, playlists: Vec<PlaylistRecord>) {
        self.catalog.lock().await.playlists = playlists;
    }

    pub async fn set_playlist_items(&self, playlist_id: &str, track_ids: &[&str]) {
        self.catalog.lock().await.playlist_items.insert(
            playlist_id.to_string(),
            track_ids.iter().map(|id| id.to_string()).collect(),
        );
    }

    pub async fn fail_playlists(&self, fail: bool) {
        *self.fail_playlists.lock().await = fail;
    }

    /// Make `fetch_albums_by_id` commit a write to `source_id` before answering,
    /// like another sync landing while the request is in flight
    pub async fn write_during_album_lookup(&self, pool: SqlitePool, source_id: &str) {
        *self.album_lookup_writer.lock().await = Some((pool, source_id.to_string()));
    }

    /// Hold every `fetch_tracks` call until [`release_tracks`](Self::release_tracks)
    pub async fn hold_tracks(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.track_gate.lock().await = Some(Arc::clone(&gate));
        gate
    }
}

#[async_trait]
impl MediaServerClient for FakeServer {
    async fn fetch_artists(&self) -> BridgeResult<Vec<ArtistRecord>> {
        Ok(self.catalog.lock().await.artists.clone())
    }

    async fn fetch_albums(&self, artist_id: Option<String>) -> BridgeResult<Vec<AlbumRecord>> {
        assert!(artist_id.is_none(), "full sync lists every album");
        Ok(self.catalog.lock().await.albums.clone())
    }

    async fn fetch_albums_by_id(&self, album_ids: Vec<String>) -> BridgeResult<Vec<AlbumRecord>> {
        let writer = self.album_lookup_writer.lock().await.clone();
        if let Some((pool, source_id)) = writer {
            commit_artist(&pool, &source_id)
                .await
                .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;
        }

        Ok(self
            .catalog
            .lock()
            .await
            .albums
            .iter()
            .filter(|a| album_ids.contains(&a.id))
            .cloned()
            .collect())
    }

    async fn fetch_tracks(&self, _album_id: Option<String>) -> BridgeResult<Vec<TrackRecord>> {
        self.tracks_requested.notify_one();
        let gate = self.track_gate.lock().await.clone();
        if let Some(gate) = gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;
        }
        Ok(self.catalog.lock().await.tracks.clone())
    }

    async fn fetch_playlists(&self) -> BridgeResult<Vec<PlaylistRecord>> {
        if *self.fail_playlists.lock().await {
            return Err(BridgeError::Http {
                status: 500,
                message: "playlist listing failed".to_string(),
            });
        }
        Ok(self.catalog.lock().await.playlists.clone())
    }

    async fn fetch_playlist_items(&self, playlist_id: &str) -> BridgeResult<Vec<TrackRecord>> {
        let catalog = self.catalog.lock().await;
        let ids = catalog
            .playlist_items
            .get(playlist_id)
            .cloned()
            .unwrap_or_default();
        Ok(ids.iter().map(|id| track(id, id)).collect())
    }
}

async fn commit_artist(pool: &SqlitePool, source_id: &str) -> core_library::Result<()> {
    let mut tx = LibraryTransaction::begin(pool).await?;
    tx.upsert_artist(&Artist::new(source_id, "side-1", "Side Writer", START))
        .await?;
    tx.commit().await
}

// ============================================================================
// Recording download manager
// ============================================================================

/// Records every removal notice it receives
#[derive(Default)]
pub struct RecordingCleaner {
    pub calls: AsyncMutex<Vec<(String, Vec<RemovedTrack>)>>,
}

impl RecordingCleaner {
    /// Wait until at least `count` notices arrived, or give up after a second
    pub async fn wait_for_calls(&self, count: usize) -> Vec<(String, Vec<RemovedTrack>)> {
        for _ in 0..100 {
            {
                let calls = self.calls.lock().await;
                if calls.len() >= count {
                    return calls.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl OfflineCacheCleaner for RecordingCleaner {
    async fn remove_offline_copies(
        &self,
        source_id: &str,
        removed: Vec<RemovedTrack>,
    ) -> BridgeResult<()> {
        self.calls
            .lock()
            .await
            .push((source_id.to_string(), removed));
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub const START: i64 = 1_700_000_000;

pub struct Harness {
    pub pool: SqlitePool,
    pub source: Source,
    pub bus: EventBus,
    pub clock: Arc<FixedClock>,
    pub cleaner: Arc<RecordingCleaner>,
    pub coordinator: Arc<SyncCoordinator>,
    pub incremental: IncrementalMetadataSync,
    /// Keeps a file-backed database alive for the test
    _dir: Option<TempDir>,
}

pub async fn harness(server: Arc<FakeServer>) -> Harness {
    harness_for(server, ServerKind::Jellyfin).await
}

pub async fn harness_for(server: Arc<FakeServer>, kind: ServerKind) -> Harness {
    let pool = create_test_pool().await.unwrap();
    build_harness(pool, server, kind, None).await
}

/// Harness over a WAL database file with a multi-connection pool
pub async fn file_harness(server: Arc<FakeServer>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let pool = create_pool(DatabaseConfig::new(dir.path().join("library.db")))
        .await
        .unwrap();
    build_harness(pool, server, ServerKind::Jellyfin, Some(dir)).await
}

async fn build_harness(
    pool: SqlitePool,
    server: Arc<FakeServer>,
    kind: ServerKind,
    dir: Option<TempDir>,
) -> Harness {
    let source = insert_test_source(&pool, kind).await.unwrap();
    let clock = Arc::new(FixedClock::at(START));
    let cleaner = Arc::new(RecordingCleaner::default());
    let bus = EventBus::new(1024);

    let config = CoreConfig::builder()
        .database_path("unused.db")
        .clock(clock.clone())
        .offline_cleaner(cleaner.clone())
        .build()
        .unwrap();

    let clients = ClientRegistry::new();
    clients.register(&source.id, server).await;

    let coordinator = Arc::new(SyncCoordinator::new(
        pool.clone(),
        bus.clone(),
        &config,
        clients.clone(),
    ));
    let incremental =
        IncrementalMetadataSync::new(pool.clone(), clock.clone(), bus.clone(), clients);

    Harness {
        pool,
        source,
        bus,
        clock,
        cleaner,
        coordinator,
        incremental,
        _dir: dir,
    }
}

// ============================================================================
// Record builders
// ============================================================================

pub fn artist(id: &str, name: &str) -> ArtistRecord {
    ArtistRecord {
        id: id.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn album(id: &str, name: &str, album_artist: Option<&str>) -> AlbumRecord {
    AlbumRecord {
        id: id.to_string(),
        name: name.to_string(),
        album_artist: album_artist.map(str::to_string),
        production_year: Some(1994),
        ..Default::default()
    }
}

pub fn track(id: &str, name: &str) -> TrackRecord {
    TrackRecord {
        id: id.to_string(),
        name: name.to_string(),
        run_time_ticks: Some(2_400_000_000),
        user_data: Some(UserItemData {
            play_count: Some(3),
            is_favorite: Some(false),
        }),
        ..Default::default()
    }
}

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
        ..track(id, name)
    }
}

pub fn playlist(id: &str, name: &str, path: Option<&str>) -> PlaylistRecord {
    PlaylistRecord {
        id: id.to_string(),
        name: name.to_string(),
        path: path.map(str::to_string),
        ..Default::default()
    }
}

/// Two artists, three albums (one by an unknown artist) and five tracks
pub async fn seed_small_library(server: &FakeServer) {
    server
        .set_artists(vec![
            artist("ar-1", "Portishead"),
            artist("ar-2", "Massive Attack"),
        ])
        .await;
    server
        .set_albums(vec![
            album("al-1", "Dummy", Some("Portishead")),
            album("al-2", "Mezzanine", Some("massive attack")),
            album("al-3", "Mystery Tapes", Some("Unknown Band")),
        ])
        .await;
    server
        .set_tracks(vec![
            album_track("t-1", "Sour Times", "al-1", "Portishead", &["Trip-Hop"]),
            album_track("t-2", "Roads", "al-1", "Portishead", &["trip hop"]),
            album_track("t-3", "Teardrop", "al-2", "Massive Attack", &["Electronic, Trip Hop"]),
            album_track("t-4", "Angel", "al-2", "Massive Attack", &["Rock"]),
            album_track("t-5", "Side B", "al-3", "Unknown Band", &[]),
        ])
        .await;
}
