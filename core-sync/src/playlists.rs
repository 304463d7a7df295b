//! # Playlist Syncer
//!
//! Mirrors the playlists of one server flavour into the cache. Records tagged
//! with another flavour are ignored; records without a tag belong to the
//! server being queried. Playlists gone from the remote list are deleted.
//!
//! ## Read-only detection
//!
//! File-backed playlists (an `.m3u` in a music folder, say) cannot be edited
//! through the server API. The two servers expose this differently, so each
//! gets its own rule:
//!
//! - **Emby** is strict: a playlist-file extension or a `FileSystem`
//!   location makes it read-only.
//! - **Jellyfin** is permissive: only a playlist file inside a user media
//!   directory is read-only. Its own `data/playlists` and `config`
//!   directories always hold editable playlists.
//!
//! Anything ambiguous is treated as editable.

use crate::progress::{stage, ProgressReporter, PLAYLIST_BAND};
use crate::Result;
use bridge_traits::{Clock, MediaServerClient, PlaylistRecord, ServerKind};
use core_library::{LibraryTransaction, Playlist, Source};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use core_runtime::logging::strip_path;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Extensions of playlist files a server can import
const PLAYLIST_EXTENSIONS: [&str; 7] = ["m3u", "m3u8", "pls", "wpl", "xspf", "asx", "zpl"];

/// Directory markers of user media libraries
const MEDIA_DIR_MARKERS: [&str; 8] = [
    "/music/", "/media/", "/mnt/", "/home/", "/srv/", "/volumes/", "/library/", "/storage/",
];

/// Jellyfin's own playlist storage
const JELLYFIN_INTERNAL_MARKERS: [&str; 2] = ["/data/playlists", "/config/"];

/// Whether a playlist stored at `path` is file-backed and must not be edited
pub fn is_read_only(kind: ServerKind, path: Option<&str>, location_type: Option<&str>) -> bool {
    let path = path.map(|p| p.trim().to_lowercase().replace('\\', "/"));
    let path = path.as_deref().filter(|p| !p.is_empty());

    match kind {
        ServerKind::Emby => {
            path.is_some_and(has_playlist_extension)
                || location_type.is_some_and(|t| t.trim().eq_ignore_ascii_case("FileSystem"))
        }
        ServerKind::Jellyfin => match path {
            None => false,
            Some(p) if is_jellyfin_internal(p) => false,
            Some(p) => has_playlist_extension(p) && is_media_directory(p),
        },
    }
}

fn has_playlist_extension(path: &str) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name
        .rsplit_once('.')
        .is_some_and(|(_, ext)| PLAYLIST_EXTENSIONS.contains(&ext))
}

fn is_jellyfin_internal(path: &str) -> bool {
    path.starts_with("config/")
        || path.starts_with("data/playlists")
        || JELLYFIN_INTERNAL_MARKERS.iter().any(|m| path.contains(m))
}

fn is_media_directory(path: &str) -> bool {
    MEDIA_DIR_MARKERS.iter().any(|m| path.contains(m)) || has_drive_letter(path)
}

fn has_drive_letter(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}

/// Counts of one playlist sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaylistSyncStats {
    pub upserted: u64,
    pub deleted: u64,
    /// Playlists skipped because they belong to the other server flavour
    pub skipped: u64,
    /// Track entries written for editable playlists
    pub items_materialized: u64,
}

pub struct PlaylistSyncer {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
    materialize_items: bool,
}

impl PlaylistSyncer {
    pub fn new(
        pool: SqlitePool,
        clock: Arc<dyn Clock>,
        event_bus: EventBus,
        materialize_items: bool,
    ) -> Self {
        Self {
            pool,
            clock,
            event_bus,
            materialize_items,
        }
    }

    /// Fetch the remote playlists of `source` and mirror them.
    ///
    /// Remote failures abort before anything is written.
    #[instrument(skip_all, fields(source_id = %source.id, kind = %source.server_kind))]
    pub async fn sync_playlists(
        &self,
        source: &Source,
        client: &dyn MediaServerClient,
        progress: &ProgressReporter,
    ) -> Result<PlaylistSyncStats> {
        progress.report(PLAYLIST_BAND.start, stage::PLAYLISTS);
        let origin = source.server_kind;

        let fetched = client.fetch_playlists().await?;
        let total = fetched.len();
        let mut seen = HashSet::new();
        let mut records: Vec<PlaylistRecord> = Vec::with_capacity(total);
        for record in fetched {
            if record.origin.unwrap_or(origin) == origin
                && !record.id.trim().is_empty()
                && seen.insert(record.id.clone())
            {
                records.push(record);
            }
        }
        let mut stats = PlaylistSyncStats {
            skipped: (total - records.len()) as u64,
            ..Default::default()
        };

        // Membership is fetched up front so no request runs inside the transaction
        let mut items: HashMap<String, Vec<String>> = HashMap::new();
        if self.materialize_items {
            for record in records.iter().filter(|r| {
                !is_read_only(origin, r.path.as_deref(), r.location_type.as_deref())
            }) {
                let tracks = client.fetch_playlist_items(&record.id).await?;
                items.insert(
                    record.id.clone(),
                    tracks.into_iter().map(|t| t.id).collect(),
                );
            }
        }

        let now = self.clock.unix_timestamp();
        let mut tx = LibraryTransaction::begin(&self.pool).await?;
        let existing: HashMap<String, Playlist> = tx
            .playlists(&source.id, origin)
            .await?
            .into_iter()
            .map(|p| (p.remote_id.clone(), p))
            .collect();

        for (position, record) in records.iter().enumerate() {
            let mut playlist = match existing.get(&record.id) {
                Some(current) => current.clone(),
                None => Playlist::new(&source.id, &record.id, origin, &record.name, now),
            };
            playlist.name = record.name.clone();
            playlist.summary = record.overview.clone().filter(|s| !s.trim().is_empty());
            playlist.owner_id = record.owner_user_id.clone();
            playlist.path = record.path.clone();
            playlist.is_read_only =
                is_read_only(origin, record.path.as_deref(), record.location_type.as_deref());

            if existing.get(&record.id) != Some(&playlist) {
                playlist.updated_at = now;
                tx.upsert_playlist(&playlist).await?;
            }
            stats.upserted += 1;

            if playlist.is_read_only {
                tx.replace_playlist_tracks(&playlist.id, &[]).await?;
            } else if let Some(remote_track_ids) = items.get(&record.id) {
                let track_ids = local_track_ids(&mut tx, &source.id, remote_track_ids).await?;
                stats.items_materialized += track_ids.len() as u64;
                tx.replace_playlist_tracks(&playlist.id, &track_ids).await?;
            }

            debug!(
                name = %playlist.name,
                read_only = playlist.is_read_only,
                path = %playlist.path.as_deref().map(strip_path).unwrap_or_default(),
                "Synced playlist"
            );
            progress.report(PLAYLIST_BAND.batch(position + 1, records.len()), stage::PLAYLISTS);
        }

        let fetched_ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
        let stale: Vec<String> = existing
            .values()
            .filter(|p| !fetched_ids.contains(p.remote_id.as_str()))
            .map(|p| p.id.clone())
            .collect();
        stats.deleted = tx.delete_playlists(&stale).await?;
        tx.commit().await?;

        progress.report(PLAYLIST_BAND.end, stage::PLAYLISTS);
        info!(
            upserted = stats.upserted,
            deleted = stats.deleted,
            skipped = stats.skipped,
            "Playlists synchronized"
        );
        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::PlaylistsSynced {
                source_id: source.id.clone(),
                upserted: stats.upserted,
                deleted: stats.deleted,
            }))
            .ok();

        Ok(stats)
    }
}

/// Local ids of the cached tracks among `remote_ids`, in playlist order
async fn local_track_ids(
    tx: &mut LibraryTransaction,
    source_id: &str,
    remote_ids: &[String],
) -> Result<Vec<String>> {
    let cached: HashMap<String, String> = tx
        .tracks_by_remote_ids(source_id, remote_ids)
        .await?
        .into_iter()
        .map(|t| (t.remote_id, t.id))
        .collect();

    Ok(remote_ids
        .iter()
        .filter_map(|remote_id| cached.get(remote_id).cloned())
        .collect())
}
