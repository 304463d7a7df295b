use crate::job::SyncJobStats;
use bridge_traits::error::BridgeError;
use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Remote catalog error: {0}")]
    Remote(#[from] BridgeError),

    #[error("Library cache error: {0}")]
    Persistence(#[from] LibraryError),

    #[error("Sync already in progress for source {source_id}")]
    AlreadySyncing { source_id: String },

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Source {source_id} not found")]
    SourceNotFound { source_id: String },

    #[error("No media server client registered for source {source_id}")]
    ClientNotRegistered { source_id: String },

    /// The catalog was committed; only the playlist phase failed.
    #[error("Catalog synced, playlist sync failed: {source}")]
    PlaylistSync {
        catalog: SyncJobStats,
        #[source]
        source: Box<SyncError>,
    },

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Whether the error came from the remote server rather than local state
    pub fn is_remote(&self) -> bool {
        match self {
            SyncError::Remote(_) => true,
            SyncError::PlaylistSync { source, .. } => source.is_remote(),
            _ => false,
        }
    }

    /// Catalog counts that were committed before the run failed
    pub fn committed_catalog(&self) -> Option<&SyncJobStats> {
        match self {
            SyncError::PlaylistSync { catalog, .. } => Some(catalog),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
