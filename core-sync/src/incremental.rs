//! # Incremental Metadata Sync
//!
//! Makes a handful of tracks playable before the next full sync has run, for
//! example tracks surfaced by a search or a playlist. Whatever the tracks
//! reference and the cache lacks is filled in:
//!
//! - albums are fetched by id
//! - unknown artist names become placeholder artists (no remote id)
//! - unknown genres are created
//!
//! A later full sync adopts each placeholder once it sees an artist of the
//! same name. This path never deletes and never assigns a remote id to a
//! placeholder.

use crate::clients::ClientRegistry;
use crate::import::{
    album_links, apply_album_record, apply_track_record, detect_change, referenced_genres,
    Change, NameIndex, TrackLinks,
};
use crate::{Result, SyncError};
use bridge_traits::{AlbumRecord, Clock, TrackRecord};
use core_library::repositories::{
    AlbumRepository, SourceRepository, SqliteAlbumRepository, SqliteSourceRepository,
};
use core_library::{Album, Artist, Genre, LibraryTransaction, Track};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// What an incremental pass wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncrementalStats {
    pub albums_fetched: u64,
    pub genres_created: u64,
    pub tracks_added: u64,
    pub tracks_updated: u64,
    pub tracks_unchanged: u64,
    /// Names of the placeholder artists created, in creation order
    pub placeholders_created: Vec<String>,
}

pub struct IncrementalMetadataSync {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
    clients: ClientRegistry,
}

impl IncrementalMetadataSync {
    pub fn new(
        pool: SqlitePool,
        clock: Arc<dyn Clock>,
        event_bus: EventBus,
        clients: ClientRegistry,
    ) -> Self {
        Self {
            pool,
            clock,
            event_bus,
            clients,
        }
    }

    /// Upsert `tracks` together with the albums, artists and genres they need.
    #[instrument(skip(self, tracks), fields(tracks = tracks.len()))]
    pub async fn sync_missing_metadata(
        &self,
        source_id: &str,
        tracks: &[TrackRecord],
    ) -> Result<IncrementalStats> {
        let client = self.clients.get(source_id).await?;
        let tracks: Vec<&TrackRecord> = tracks.iter().filter(|t| !t.id.trim().is_empty()).collect();
        let mut stats = IncrementalStats::default();
        if tracks.is_empty() {
            return Ok(stats);
        }
        let now = self.clock.unix_timestamp();

        // Reads and the album request run before the transaction so no
        // connection is held across network I/O.
        if SqliteSourceRepository::new(self.pool.clone())
            .find_by_id(source_id)
            .await?
            .is_none()
        {
            return Err(SyncError::SourceNotFound {
                source_id: source_id.to_string(),
            });
        }

        let album_ids = referenced_album_ids(&tracks);
        let cached = SqliteAlbumRepository::new(self.pool.clone())
            .find_by_remote_ids(source_id, &album_ids)
            .await?;
        let missing = uncached_album_ids(&album_ids, &cached);
        let fetched: Vec<AlbumRecord> = if missing.is_empty() {
            Vec::new()
        } else {
            let requested: HashSet<&str> = missing.iter().map(String::as_str).collect();
            client
                .fetch_albums_by_id(missing.clone())
                .await?
                .into_iter()
                .filter(|a| requested.contains(a.id.as_str()))
                .collect()
        };

        let mut tx = LibraryTransaction::begin(&self.pool).await?;
        // Another run may have cached some of these albums meanwhile
        let mut albums = tx.albums_by_remote_ids(source_id, &album_ids).await?;
        let still_missing: HashSet<String> =
            uncached_album_ids(&album_ids, &albums).into_iter().collect();
        let fetched: Vec<AlbumRecord> = fetched
            .into_iter()
            .filter(|a| still_missing.contains(&a.id))
            .collect();

        // Artists: real ones win over placeholders of the same name
        let mut known = tx.artists(source_id).await?;
        known.sort_by(|a, b| {
            (a.is_placeholder(), a.created_at, &a.id).cmp(&(b.is_placeholder(), b.created_at, &b.id))
        });
        let mut artists = NameIndex::new();
        for artist in &known {
            artists.insert_artist(artist);
        }

        for name in referenced_artist_names(&tracks, &fetched) {
            if artists.contains(&name) {
                continue;
            }
            let placeholder = Artist::placeholder(source_id, &name, now);
            tx.upsert_artist(&placeholder).await?;
            artists.insert_artist(&placeholder);
            debug!(name = %placeholder.name, "Created placeholder artist");
            stats.placeholders_created.push(placeholder.name);
        }

        let mut seen_albums = HashSet::new();
        for record in &fetched {
            if !seen_albums.insert(record.id.as_str()) {
                continue;
            }
            let mut album = Album::new(source_id, &record.id, &record.name, now);
            apply_album_record(&mut album, record, &artists);
            tx.upsert_album(&album).await?;
            albums.push(album);
            stats.albums_fetched += 1;
        }

        // Genres, created only when absent
        let mut genres: HashMap<String, Genre> = tx
            .genres(source_id)
            .await?
            .into_iter()
            .map(|g| (g.normalized_name.clone(), g))
            .collect();
        let owned: Vec<TrackRecord> = tracks.iter().map(|t| (*t).clone()).collect();
        for (display, key) in referenced_genres(&owned) {
            if genres.contains_key(&key) {
                continue;
            }
            let genre = Genre::new(source_id, &display, &key, now);
            tx.upsert_genre(&genre).await?;
            genres.insert(key, genre);
            stats.genres_created += 1;
        }

        // Tracks
        let track_ids: Vec<String> = owned.iter().map(|t| t.id.clone()).collect();
        let mut existing: HashMap<String, Track> = tx
            .tracks_by_remote_ids(source_id, &track_ids)
            .await?
            .into_iter()
            .map(|t| (t.remote_id.clone(), t))
            .collect();
        let album_index = album_links(albums.iter());
        let links = TrackLinks {
            albums: &album_index,
            artists: &artists,
            genres: &genres,
        };

        for record in &owned {
            let current = existing.get(&record.id);
            let mut candidate = match current {
                Some(track) => track.clone(),
                None => Track::new(source_id, &record.id, &record.name, now),
            };
            let genre_ids = apply_track_record(&mut candidate, record, &links);

            let change = detect_change(current, &mut candidate, now);
            if change.needs_write() {
                tx.upsert_track(&candidate).await?;
                tx.replace_track_genres(&candidate.id, &genre_ids).await?;
            }
            match change {
                Change::Added => stats.tracks_added += 1,
                Change::Updated => stats.tracks_updated += 1,
                Change::Unchanged => stats.tracks_unchanged += 1,
            }
            existing.insert(record.id.clone(), candidate);
        }

        tx.commit().await?;

        info!(
            albums = stats.albums_fetched,
            placeholders = stats.placeholders_created.len(),
            genres = stats.genres_created,
            added = stats.tracks_added,
            updated = stats.tracks_updated,
            "Filled in missing metadata"
        );
        if !stats.placeholders_created.is_empty() {
            self.event_bus
                .emit(CoreEvent::Library(LibraryEvent::PlaceholderArtistsCreated {
                    source_id: source_id.to_string(),
                    names: stats.placeholders_created.clone(),
                }))
                .ok();
        }

        Ok(stats)
    }
}

/// Distinct, non-blank album ids in first-seen order
fn referenced_album_ids(tracks: &[&TrackRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    tracks
        .iter()
        .filter_map(|t| t.album_id.as_deref())
        .map(str::trim)
        .filter(|id| !id.is_empty() && seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}

/// Ids from `album_ids` with no row in `cached`
fn uncached_album_ids(album_ids: &[String], cached: &[Album]) -> Vec<String> {
    let cached: HashSet<&str> = cached.iter().map(|a| a.remote_id.as_str()).collect();
    album_ids
        .iter()
        .filter(|id| !cached.contains(id.as_str()))
        .cloned()
        .collect()
}

/// Every artist name the tracks and fetched albums mention
fn referenced_artist_names(tracks: &[&TrackRecord], albums: &[AlbumRecord]) -> Vec<String> {
    let track_names = tracks.iter().flat_map(|t| {
        t.artists
            .iter()
            .map(String::as_str)
            .chain(t.album_artist.as_deref())
    });
    let album_names = albums.iter().filter_map(|a| a.album_artist.as_deref());

    track_names
        .chain(album_names)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
