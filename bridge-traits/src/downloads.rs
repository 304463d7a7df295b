//! Download manager contract
//!
//! When a sync removes tracks from the cache, any offline audio stored for them
//! must go too. The engine only notifies; deleting files is the host's job.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A track that disappeared from the remote catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemovedTrack {
    /// Local cache identifier
    pub track_id: String,
    /// Server-side item id
    pub remote_id: String,
}

#[async_trait]
pub trait OfflineCacheCleaner: Send + Sync {
    /// Delete locally stored audio for the given tracks of `source_id`
    async fn remove_offline_copies(&self, source_id: &str, removed: Vec<RemovedTrack>)
        -> Result<()>;
}
