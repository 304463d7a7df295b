//! # Sync Module
//!
//! Mirrors a Jellyfin or Emby catalog into the local library cache.
//!
//! ## Overview
//!
//! A full sync fetches the complete remote catalog, reconciles it with the
//! cache in one transaction, deletes what disappeared remotely and then
//! mirrors playlists. Only one full sync runs per Source at a time.
//!
//! ## Components
//!
//! - **Sync Coordinator** (`coordinator`): single-flight full syncs with cancellation
//! - **Catalog Fetcher** (`fetcher`): concurrent artist, album and track requests
//! - **Snapshot Import** (`import`): the artist, album, genre and track phases
//! - **Orphan Cleanup** (`cleanup`): deletes entities gone from the server
//! - **Playlist Syncer** (`playlists`): mirrors playlists of one server flavour
//! - **Incremental Metadata Sync** (`incremental`): fills in what a few tracks reference
//! - **Sync Job** (`job`): job state machine and statistics
//! - **Progress** (`progress`): monotonic progress reporting in fixed bands

pub mod cleanup;
pub mod clients;
pub mod coordinator;
pub mod error;
pub mod fetcher;
pub mod import;
pub mod incremental;
pub mod job;
pub mod playlists;
pub mod progress;

#[cfg(test)]
mod test_support;

pub use cleanup::{CleanupReport, OrphanCleanup};
pub use clients::ClientRegistry;
pub use coordinator::SyncCoordinator;
pub use error::{Result, SyncError};
pub use fetcher::{CatalogFetcher, RemoteIds, RemoteSnapshot};
pub use import::{CatalogImporter, EntityStats, ImportOutcome, ImportStats, LocalCatalog, NameIndex};
pub use incremental::{IncrementalMetadataSync, IncrementalStats};
pub use job::{SyncJob, SyncJobId, SyncJobStats, SyncProgress, SyncStatus};
pub use playlists::{is_read_only, PlaylistSyncStats, PlaylistSyncer};
pub use progress::{ProgressBand, ProgressCallback, ProgressReporter};
