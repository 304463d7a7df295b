//! # Sync Job State Machine
//!
//! Tracks the lifecycle of one sync run with validated state transitions.
//!
//! ## State Machine
//!
//! ```text
//! Pending → Running → Completed
//!     ↓         ↓
//!     └──────→ Failed
//!     └──────→ Cancelled
//! ```
//!
//! Timestamps are passed in by the caller, which reads them from the injected
//! [`Clock`](bridge_traits::Clock).
//!
//! ## Usage
//!
//! ```rust
//! use core_sync::{SyncJob, SyncJobStats, SyncStatus};
//!
//! let job = SyncJob::new("jf-home", 100);
//! let mut job = job.start(100)?;
//! job.progress.update(0.45, "Importing albums");
//!
//! let job = job.complete(SyncJobStats::default(), 160)?;
//! assert_eq!(job.status, SyncStatus::Completed);
//! assert_eq!(job.duration_secs(), Some(60));
//! # Ok::<(), core_sync::SyncError>(())
//! ```

use crate::{Result, SyncError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncJobId(Uuid);

impl SyncJobId {
    /// Create a new random sync job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the string representation of this ID
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for SyncJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SyncJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Status Types
// ============================================================================

/// The current status of a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Job has been created but not yet started
    Pending,
    /// Job is currently running
    Running,
    /// Job completed successfully
    Completed,
    /// Job failed with an error
    Failed,
    /// Job was cancelled by the user
    Cancelled,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Running => "running",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
            SyncStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Progress Types
// ============================================================================

/// Progress information for a running sync job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    /// Progress percentage (0-100)
    pub percent: u8,
    /// Stage label of the last report
    pub stage: String,
}

impl SyncProgress {
    pub fn new() -> Self {
        Self {
            percent: 0,
            stage: "Initializing".to_string(),
        }
    }

    /// Record an overall fraction in `[0, 1]` and the stage it belongs to.
    pub fn update(&mut self, fraction: f64, stage: &str) {
        self.percent = fraction_to_percent(fraction);
        self.stage = stage.to_string();
    }
}

impl Default for SyncProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a progress fraction to a whole percentage, clamped to 0-100
pub fn fraction_to_percent(fraction: f64) -> u8 {
    if fraction.is_nan() {
        return 0;
    }
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Statistics collected upon sync job completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncJobStats {
    /// Catalog rows created
    pub items_added: u64,
    /// Catalog rows rewritten because a field changed
    pub items_updated: u64,
    /// Catalog rows left untouched
    pub items_unchanged: u64,
    /// Artists, albums and tracks removed as orphans
    pub items_deleted: u64,
    /// Playlists inserted or refreshed
    pub playlists_synced: u64,
}

// ============================================================================
// Sync Job Entity
// ============================================================================

/// A sync job with state machine semantics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncJob {
    pub id: SyncJobId,
    /// Source being synced
    pub source_id: String,
    pub status: SyncStatus,
    pub progress: SyncProgress,
    /// Statistics (only available when completed)
    pub stats: Option<SyncJobStats>,
    /// Error message if failed
    pub error_message: Option<String>,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
}

impl SyncJob {
    /// Create a new full sync job in pending state
    pub fn new(source_id: impl Into<String>, now: i64) -> Self {
        Self {
            id: SyncJobId::new(),
            source_id: source_id.into(),
            status: SyncStatus::Pending,
            progress: SyncProgress::new(),
            stats: None,
            error_message: None,
            created_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// Start the sync job
    ///
    /// # Errors
    ///
    /// Returns an error if the job is not in `Pending` state
    pub fn start(mut self, now: i64) -> Result<Self> {
        self.validate_transition(SyncStatus::Running)?;
        self.status = SyncStatus::Running;
        self.started_at = Some(now);
        self.progress.stage = "Starting sync".to_string();
        Ok(self)
    }

    /// Mark the job as completed with statistics
    pub fn complete(mut self, stats: SyncJobStats, now: i64) -> Result<Self> {
        self.validate_transition(SyncStatus::Completed)?;
        self.status = SyncStatus::Completed;
        self.completed_at = Some(now);
        self.stats = Some(stats);
        self.progress.percent = 100;
        self.progress.stage = "Completed".to_string();
        Ok(self)
    }

    /// Mark the job as failed. The stage of the last progress report is kept.
    pub fn fail(mut self, error_message: String, now: i64) -> Result<Self> {
        self.validate_transition(SyncStatus::Failed)?;
        self.status = SyncStatus::Failed;
        self.completed_at = Some(now);
        self.error_message = Some(error_message);
        Ok(self)
    }

    /// Cancel the job. The stage of the last progress report is kept.
    pub fn cancel(mut self, now: i64) -> Result<Self> {
        self.validate_transition(SyncStatus::Cancelled)?;
        self.status = SyncStatus::Cancelled;
        self.completed_at = Some(now);
        Ok(self)
    }

    /// Stage the job was in when it last reported progress
    pub fn last_stage(&self) -> &str {
        &self.progress.stage
    }

    /// Get the duration of the job in seconds
    ///
    /// Returns None if the job hasn't started or completed yet
    pub fn duration_secs(&self) -> Option<u64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end.saturating_sub(start).max(0) as u64),
            _ => None,
        }
    }

    fn validate_transition(&self, to: SyncStatus) -> Result<()> {
        let valid = matches!(
            (self.status, to),
            (SyncStatus::Pending, SyncStatus::Running)
                | (SyncStatus::Pending, SyncStatus::Cancelled)
                | (SyncStatus::Pending, SyncStatus::Failed)
                | (SyncStatus::Running, SyncStatus::Completed)
                | (SyncStatus::Running, SyncStatus::Failed)
                | (SyncStatus::Running, SyncStatus::Cancelled)
        );

        if !valid {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Cannot transition from {} to {}",
                    self.status.as_str(),
                    to.as_str()
                ),
            });
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
