//! # Orphan Cleanup
//!
//! After the import phases, anything cached locally whose remote id is not in
//! the snapshot no longer exists on the server and is deleted in the same
//! transaction. Placeholder artists nobody resolved go the same way.
//!
//! Once the transaction has committed, [`OrphanCleanup::dispatch`] tells the
//! download manager which tracks vanished so it can drop their offline audio.
//! That call runs on its own task and its failures are only logged.

use crate::fetcher::RemoteIds;
use crate::import::LocalCatalog;
use crate::progress::{stage, ProgressReporter, CLEANUP_BAND};
use crate::Result;
use bridge_traits::{OfflineCacheCleaner, RemovedTrack};
use core_library::LibraryTransaction;
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// What a cleanup pass removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub artists_deleted: u64,
    pub albums_deleted: u64,
    pub tracks_deleted: u64,
    /// Genres left without tracks
    pub genres_pruned: u64,
    pub removed_tracks: Vec<RemovedTrack>,
}

impl CleanupReport {
    /// Artists, albums and tracks deleted
    pub fn items_deleted(&self) -> u64 {
        self.artists_deleted + self.albums_deleted + self.tracks_deleted
    }
}

pub struct OrphanCleanup {
    source_id: String,
    cleaner: Option<Arc<dyn OfflineCacheCleaner>>,
    event_bus: EventBus,
}

impl OrphanCleanup {
    pub fn new(
        source_id: impl Into<String>,
        cleaner: Option<Arc<dyn OfflineCacheCleaner>>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            cleaner,
            event_bus,
        }
    }

    /// Delete every cached artist, album and track missing from `remote`.
    ///
    /// `catalog` is the local state left by the import phases.
    #[instrument(skip_all, fields(source_id = %self.source_id))]
    pub async fn remove_orphans(
        &self,
        tx: &mut LibraryTransaction,
        remote: &RemoteIds,
        catalog: &LocalCatalog,
        progress: &ProgressReporter,
    ) -> Result<CleanupReport> {
        progress.report(CLEANUP_BAND.start, stage::CLEANUP);

        let mut removed_tracks: Vec<RemovedTrack> = catalog
            .tracks
            .values()
            .filter(|t| !remote.tracks.contains(&t.remote_id))
            .map(|t| RemovedTrack {
                track_id: t.id.clone(),
                remote_id: t.remote_id.clone(),
            })
            .collect();
        removed_tracks.sort_by(|a, b| a.remote_id.cmp(&b.remote_id));

        let mut orphan_albums: Vec<String> = catalog
            .albums
            .values()
            .filter(|a| !remote.albums.contains(&a.remote_id))
            .map(|a| a.id.clone())
            .collect();
        orphan_albums.sort();

        let mut orphan_artists: Vec<String> = catalog
            .artists
            .values()
            .filter(|a| {
                a.remote_id
                    .as_ref()
                    .map_or(true, |remote_id| !remote.artists.contains(remote_id))
            })
            .map(|a| a.id.clone())
            .collect();
        orphan_artists.sort();

        let track_ids: Vec<String> = removed_tracks.iter().map(|t| t.track_id.clone()).collect();
        let tracks_deleted = tx.delete_tracks(&track_ids).await?;
        let albums_deleted = tx.delete_albums(&orphan_albums).await?;
        let artists_deleted = tx.delete_artists(&orphan_artists).await?;
        let genres_pruned = tx.delete_unreferenced_genres(&self.source_id).await?;

        progress.report(CLEANUP_BAND.end, stage::CLEANUP);

        let report = CleanupReport {
            artists_deleted,
            albums_deleted,
            tracks_deleted,
            genres_pruned,
            removed_tracks,
        };
        if report.items_deleted() > 0 || genres_pruned > 0 {
            info!(
                artists = artists_deleted,
                albums = albums_deleted,
                tracks = tracks_deleted,
                genres = genres_pruned,
                "Removed items missing from the remote catalog"
            );
        } else {
            debug!("No orphans to remove");
        }

        Ok(report)
    }

    /// Announce removed tracks and hand them to the download manager.
    ///
    /// Call once, after the cleanup transaction committed. Returns the handle
    /// of the spawned cleaner task, if one was started.
    pub fn dispatch(&self, report: &CleanupReport) -> Option<JoinHandle<()>> {
        if report.removed_tracks.is_empty() {
            return None;
        }

        self.event_bus
            .emit(CoreEvent::Library(LibraryEvent::TracksRemoved {
                source_id: self.source_id.clone(),
                track_ids: report
                    .removed_tracks
                    .iter()
                    .map(|t| t.track_id.clone())
                    .collect(),
            }))
            .ok();

        let cleaner = Arc::clone(self.cleaner.as_ref()?);
        let source_id = self.source_id.clone();
        let removed = report.removed_tracks.clone();

        Some(tokio::spawn(async move {
            let count = removed.len();
            match cleaner.remove_offline_copies(&source_id, removed).await {
                Ok(()) => debug!(source_id = %source_id, count, "Offline copies removed"),
                Err(e) => warn!(
                    source_id = %source_id,
                    count,
                    error = %e,
                    "Failed to remove offline copies of deleted tracks"
                ),
            }
        }))
    }
}
