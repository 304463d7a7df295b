//! # Sync Coordinator
//!
//! Runs full synchronizations, at most one per Source at a time.
//!
//! ## Workflow
//!
//! 1. Claim the Source's sync slot (or fail with `AlreadySyncing`)
//! 2. Fetch artists, albums and tracks concurrently
//! 3. Import the snapshot in one transaction: artists, albums, genres, tracks
//! 4. Delete orphans in the same transaction and commit
//! 5. Report the catalog as synced (`SyncEvent::CatalogSynced`)
//! 6. Notify the download manager of removed tracks
//! 7. Mirror playlists
//!
//! A playlist failure does not undo steps 3-5. The run still fails, with
//! [`SyncError::PlaylistSync`] carrying the committed catalog counts.
//!
//! The run executes on its own task. The slot is held by a guard owned by
//! that task, so it is released however the task ends, including a panic or
//! an abort.
//!
//! Cancellation is cooperative: the fetch is abandoned as soon as the token
//! fires, and the token is also checked after the import and before the
//! playlist phase. Cancelling before the commit rolls the import back.
//!
//! ## Usage
//!
//! ```rust,ignore
//! coordinator.register_client(&source.id, client).await;
//!
//! let job = coordinator.perform_full_sync(&source.id, None).await?;
//! println!("{} items added", job.stats.unwrap_or_default().items_added);
//! ```

use crate::cleanup::OrphanCleanup;
use crate::clients::ClientRegistry;
use crate::fetcher::CatalogFetcher;
use crate::import::CatalogImporter;
use crate::job::{SyncJob, SyncJobId, SyncJobStats};
use crate::playlists::{PlaylistSyncStats, PlaylistSyncer};
use crate::progress::{stage, ProgressCallback, ProgressReporter};
use crate::{Result, SyncError};
use bridge_traits::{Clock, MediaServerClient, OfflineCacheCleaner};
use core_library::repositories::{SourceRepository, SqliteSourceRepository};
use core_library::{LibraryTransaction, Source};
use core_runtime::config::{CoreConfig, SyncSettings};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use core_runtime::logging::redact_if_sensitive;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Slot of a Source that is currently syncing
struct ActiveSync {
    job_id: SyncJobId,
    token: CancellationToken,
}

type SlotMap = Arc<Mutex<HashMap<String, ActiveSync>>>;

/// Releases a Source's slot when the sync task ends
struct SlotGuard {
    slots: SlotMap,
    source_id: String,
    job_id: SyncJobId,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots
            .get(&self.source_id)
            .is_some_and(|active| active.job_id == self.job_id)
        {
            slots.remove(&self.source_id);
        }
    }
}

/// Orchestrates full syncs and standalone playlist syncs
pub struct SyncCoordinator {
    pool: SqlitePool,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    settings: SyncSettings,
    offline_cleaner: Option<Arc<dyn OfflineCacheCleaner>>,
    clients: ClientRegistry,
    active_syncs: SlotMap,
    task_handles: Arc<Mutex<HashMap<String, AbortHandle>>>,
}

impl SyncCoordinator {
    pub fn new(
        pool: SqlitePool,
        event_bus: EventBus,
        config: &CoreConfig,
        clients: ClientRegistry,
    ) -> Self {
        Self {
            pool,
            event_bus,
            clock: Arc::clone(&config.clock),
            settings: config.sync.clone(),
            offline_cleaner: config.offline_cleaner.clone(),
            clients,
            active_syncs: Arc::new(Mutex::new(HashMap::new())),
            task_handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register the media server client used to sync `source_id`
    pub async fn register_client(
        &self,
        source_id: impl Into<String>,
        client: Arc<dyn MediaServerClient>,
    ) {
        self.clients.register(source_id, client).await;
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Run a full sync of `source_id` and wait for it to finish.
    ///
    /// `on_progress` receives monotonically increasing fractions in `[0, 1]`
    /// with a stage label.
    ///
    /// # Errors
    ///
    /// - [`SyncError::AlreadySyncing`] if the Source is syncing already
    /// - [`SyncError::Cancelled`] if [`cancel_sync`](Self::cancel_sync) stopped the run
    /// - the underlying remote or persistence error otherwise
    #[instrument(skip(self, on_progress))]
    pub async fn perform_full_sync(
        &self,
        source_id: &str,
        on_progress: Option<ProgressCallback>,
    ) -> Result<SyncJob> {
        let client = self.clients.get(source_id).await?;

        let now = self.clock.unix_timestamp();
        let job = SyncJob::new(source_id, now).start(now)?;
        let job_id = job.id;
        let token = CancellationToken::new();
        let guard = self.claim_slot(source_id, job_id, token.clone())?;

        let progress = ProgressReporter::new(on_progress).with_events(
            self.event_bus.clone(),
            job_id.as_str(),
            source_id,
        );
        let run = FullSyncRun {
            job,
            client,
            token,
            progress: progress.clone(),
            pool: self.pool.clone(),
            event_bus: self.event_bus.clone(),
            clock: Arc::clone(&self.clock),
            settings: self.settings.clone(),
            offline_cleaner: self.offline_cleaner.clone(),
        };

        let handle = {
            let mut handles = self
                .task_handles
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(stale) = handles.remove(source_id) {
                stale.abort();
            }
            let handle = tokio::spawn(async move {
                let _slot = guard;
                run.execute().await
            });
            handles.insert(source_id.to_string(), handle.abort_handle());
            handle
        };

        match handle.await {
            Ok(result) => result,
            Err(join_error) => {
                let stage = progress.stage();
                let (err, event) = if join_error.is_cancelled() {
                    warn!(stage = %stage, "Sync task aborted");
                    (
                        SyncError::Cancelled,
                        SyncEvent::Cancelled {
                            job_id: job_id.as_str(),
                            source_id: source_id.to_string(),
                            stage,
                        },
                    )
                } else {
                    error!(stage = %stage, "Sync task panicked");
                    let message = format!("Sync task panicked: {}", join_error);
                    (
                        SyncError::Internal(message.clone()),
                        SyncEvent::Failed {
                            job_id: job_id.as_str(),
                            source_id: source_id.to_string(),
                            message,
                            stage,
                        },
                    )
                };
                self.event_bus.emit(CoreEvent::Sync(event)).ok();
                Err(err)
            }
        }
    }

    /// Request cancellation of the running sync of `source_id`.
    ///
    /// Returns whether a sync was running. Safe to call repeatedly.
    pub fn cancel_sync(&self, source_id: &str) -> bool {
        let slots = self.active_syncs.lock().unwrap_or_else(PoisonError::into_inner);
        match slots.get(source_id) {
            Some(active) => {
                if !active.token.is_cancelled() {
                    info!(source_id, job_id = %active.job_id, "Cancelling sync");
                    active.token.cancel();
                }
                true
            }
            None => false,
        }
    }

    pub fn is_syncing(&self, source_id: &str) -> bool {
        self.active_syncs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(source_id)
    }

    /// Job id of the running sync of `source_id`
    pub fn active_job(&self, source_id: &str) -> Option<SyncJobId> {
        self.active_syncs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source_id)
            .map(|active| active.job_id)
    }

    /// Mirror playlists of `source_id` without a catalog sync.
    ///
    /// Does not take the Source's sync slot.
    #[instrument(skip(self))]
    pub async fn sync_playlists(&self, source_id: &str) -> Result<PlaylistSyncStats> {
        let client = self.clients.get(source_id).await?;
        let source = load_source(&self.pool, source_id).await?;
        debug!(
            server = %source.server_kind,
            base_url = %redact_if_sensitive("base_url", &source.base_url),
            "Fetching remote catalog"
        );

        PlaylistSyncer::new(
            self.pool.clone(),
            Arc::clone(&self.clock),
            self.event_bus.clone(),
            self.settings.materialize_playlist_items,
        )
        .sync_playlists(&source, client.as_ref(), &ProgressReporter::silent())
        .await
    }

    fn claim_slot(
        &self,
        source_id: &str,
        job_id: SyncJobId,
        token: CancellationToken,
    ) -> Result<SlotGuard> {
        let mut slots = self.active_syncs.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.contains_key(source_id) {
            return Err(SyncError::AlreadySyncing {
                source_id: source_id.to_string(),
            });
        }
        slots.insert(source_id.to_string(), ActiveSync { job_id, token });

        Ok(SlotGuard {
            slots: Arc::clone(&self.active_syncs),
            source_id: source_id.to_string(),
            job_id,
        })
    }
}

/// One full sync, moved onto its own task
struct FullSyncRun {
    job: SyncJob,
    client: Arc<dyn MediaServerClient>,
    token: CancellationToken,
    progress: ProgressReporter,
    pool: SqlitePool,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    settings: SyncSettings,
    offline_cleaner: Option<Arc<dyn OfflineCacheCleaner>>,
}

impl FullSyncRun {
    async fn execute(self) -> Result<SyncJob> {
        let job_id = self.job.id.as_str();
        let source_id = self.job.source_id.clone();
        info!(source_id = %source_id, job_id = %job_id, "Starting full sync");
        self.emit(SyncEvent::Started {
            job_id: job_id.clone(),
            source_id: source_id.clone(),
        });

        let outcome = self.run_phases().await;

        let mut job = self.job.clone();
        job.progress
            .update(self.progress.fraction(), &self.progress.stage());
        let now = self.clock.unix_timestamp();

        match outcome {
            Ok(stats) => {
                let job = job.complete(stats, now)?;
                info!(
                    source_id = %source_id,
                    added = stats.items_added,
                    updated = stats.items_updated,
                    deleted = stats.items_deleted,
                    playlists = stats.playlists_synced,
                    "Full sync completed"
                );
                self.emit(SyncEvent::Completed {
                    job_id,
                    source_id,
                    items_added: stats.items_added,
                    items_updated: stats.items_updated,
                    items_deleted: stats.items_deleted,
                    playlists_synced: stats.playlists_synced,
                    duration_secs: job.duration_secs().unwrap_or(0),
                });
                Ok(job)
            }
            Err(SyncError::Cancelled) => {
                let job = job.cancel(now)?;
                info!(source_id = %source_id, stage = %job.last_stage(), "Full sync cancelled");
                self.emit(SyncEvent::Cancelled {
                    job_id,
                    source_id,
                    stage: job.last_stage().to_string(),
                });
                Err(SyncError::Cancelled)
            }
            Err(e) => {
                job.stats = e.committed_catalog().copied();
                let job = job.fail(e.to_string(), now)?;
                error!(
                    source_id = %source_id,
                    stage = %job.last_stage(),
                    error = %e,
                    "Full sync failed"
                );
                self.emit(SyncEvent::Failed {
                    job_id,
                    source_id,
                    message: e.to_string(),
                    stage: job.last_stage().to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_phases(&self) -> Result<SyncJobStats> {
        let source_id = self.job.source_id.as_str();
        self.progress.report(0.0, stage::STARTING);
        let source = load_source(&self.pool, source_id).await?;

        let fetcher = CatalogFetcher::new(Arc::clone(&self.client), self.settings.clone());
        let snapshot = tokio::select! {
            biased;
            _ = self.token.cancelled() => return Err(SyncError::Cancelled),
            fetched = fetcher.fetch_full_library(&self.progress) => fetched?,
        };
        self.checkpoint()?;

        let importer = CatalogImporter::new(source_id, Arc::clone(&self.clock), &self.settings);
        let cleanup = OrphanCleanup::new(
            source_id,
            self.offline_cleaner.clone(),
            self.event_bus.clone(),
        );

        let mut tx = LibraryTransaction::begin(&self.pool).await?;
        let imported = importer.import(&mut tx, &snapshot, &self.progress).await?;
        // Dropping the open transaction rolls the import back
        self.checkpoint()?;
        let report = cleanup
            .remove_orphans(
                &mut tx,
                &snapshot.remote_ids(),
                &imported.catalog,
                &self.progress,
            )
            .await?;
        tx.mark_source_synced(source_id, self.clock.unix_timestamp())
            .await?;
        tx.commit().await?;

        let catalog = SyncJobStats {
            items_added: imported.stats.added(),
            items_updated: imported.stats.updated(),
            items_unchanged: imported.stats.unchanged(),
            items_deleted: report.items_deleted(),
            playlists_synced: 0,
        };
        info!(
            source_id,
            added = catalog.items_added,
            updated = catalog.items_updated,
            deleted = catalog.items_deleted,
            "Catalog committed"
        );
        self.emit(SyncEvent::CatalogSynced {
            job_id: self.job.id.as_str(),
            source_id: source_id.to_string(),
            items_added: catalog.items_added,
            items_updated: catalog.items_updated,
            items_unchanged: catalog.items_unchanged,
            items_deleted: catalog.items_deleted,
        });

        // Removal notices are best effort and never block the run
        drop(cleanup.dispatch(&report));

        self.checkpoint()?;
        let playlists = PlaylistSyncer::new(
            self.pool.clone(),
            Arc::clone(&self.clock),
            self.event_bus.clone(),
            self.settings.materialize_playlist_items,
        )
        .sync_playlists(&source, self.client.as_ref(), &self.progress)
        .await
        .map_err(|e| SyncError::PlaylistSync {
            catalog,
            source: Box::new(e),
        })?;

        self.progress.report(1.0, stage::COMPLETED);

        Ok(SyncJobStats {
            playlists_synced: playlists.upserted,
            ..catalog
        })
    }

    fn checkpoint(&self) -> Result<()> {
        if self.token.is_cancelled() {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn emit(&self, event: SyncEvent) {
        self.event_bus.emit(CoreEvent::Sync(event)).ok();
    }
}

async fn load_source(pool: &SqlitePool, source_id: &str) -> Result<Source> {
    let source = SqliteSourceRepository::new(pool.clone())
        .find_by_id(source_id)
        .await?;

    source.ok_or_else(|| SyncError::SourceNotFound {
        source_id: source_id.to_string(),
    })
}
