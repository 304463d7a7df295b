//! # Core Configuration Module
//!
//! Builder-based configuration for the library sync core.
//!
//! ## Overview
//!
//! `CoreConfig` holds the database location, sync tuning and the injected
//! collaborators the engine needs. Construction goes through
//! [`CoreConfigBuilder`], which fails fast on missing or inconsistent values.
//!
//! ## Required
//!
//! - `database_path` - SQLite file backing the library cache
//!
//! ## Optional (with defaults)
//!
//! - `clock` - Time source for `created_at`/`updated_at` stamps (default: [`SystemClock`])
//! - `offline_cleaner` - Download manager notified of removed tracks (default: none)
//! - `event_buffer_size` - Broadcast buffer for the event bus
//! - `sync` - [`SyncSettings`] progress and playlist tuning
//!
//! ## Usage
//!
//! ```no_run
//! use core_runtime::config::{CoreConfig, SyncSettings};
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/var/mobile/library.db")
//!     .sync_settings(
//!         SyncSettings::default().with_track_fetch_estimate(Duration::from_secs(20)),
//!     )
//!     .build()?;
//! # Ok::<(), core_runtime::Error>(())
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{Clock, OfflineCacheCleaner, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default number of records between progress reports in the import phases.
pub const DEFAULT_PROGRESS_BATCH_SIZE: usize = 50;

/// Default ceiling for the estimated progress of the remote fetch.
pub const DEFAULT_FETCH_PROGRESS_CAP: f64 = 0.28;

/// Tuning for full sync runs.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    /// Records processed between progress reports during import
    pub progress_batch_size: usize,
    /// Expected duration of the track list request, used to pace the estimator
    pub track_fetch_estimate: Duration,
    /// Interval between estimator ticks
    pub estimator_tick: Duration,
    /// Upper bound of overall progress while the fetch is in flight (0, 1]
    pub fetch_progress_cap: f64,
    /// Materialize ordered membership for editable playlists
    pub materialize_playlist_items: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            progress_batch_size: DEFAULT_PROGRESS_BATCH_SIZE,
            track_fetch_estimate: Duration::from_secs(30),
            estimator_tick: Duration::from_millis(250),
            fetch_progress_cap: DEFAULT_FETCH_PROGRESS_CAP,
            materialize_playlist_items: true,
        }
    }
}

impl SyncSettings {
    pub fn with_progress_batch_size(mut self, size: usize) -> Self {
        self.progress_batch_size = size;
        self
    }

    pub fn with_track_fetch_estimate(mut self, estimate: Duration) -> Self {
        self.track_fetch_estimate = estimate;
        self
    }

    pub fn with_estimator_tick(mut self, tick: Duration) -> Self {
        self.estimator_tick = tick;
        self
    }

    pub fn with_fetch_progress_cap(mut self, cap: f64) -> Self {
        self.fetch_progress_cap = cap;
        self
    }

    pub fn with_playlist_items(mut self, materialize: bool) -> Self {
        self.materialize_playlist_items = materialize;
        self
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<()> {
        if self.progress_batch_size == 0 {
            return Err(Error::Config(
                "Progress batch size must be greater than 0".to_string(),
            ));
        }

        if self.track_fetch_estimate.is_zero() {
            return Err(Error::Config(
                "Track fetch estimate must be greater than 0".to_string(),
            ));
        }

        if self.estimator_tick.is_zero() {
            return Err(Error::Config(
                "Estimator tick must be greater than 0".to_string(),
            ));
        }

        if !(self.fetch_progress_cap > 0.0 && self.fetch_progress_cap <= 1.0) {
            return Err(Error::Config(format!(
                "Fetch progress cap must be within (0, 1], got {}",
                self.fetch_progress_cap
            )));
        }

        Ok(())
    }
}

/// Core configuration for the library sync engine.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Event bus buffer size
    pub event_buffer_size: usize,

    /// Time source
    pub clock: Arc<dyn Clock>,

    /// Download manager notified when tracks disappear (optional)
    pub offline_cleaner: Option<Arc<dyn OfflineCacheCleaner>>,

    /// Full sync tuning
    pub sync: SyncSettings,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("clock", &"Clock { ... }")
            .field(
                "offline_cleaner",
                &self
                    .offline_cleaner
                    .as_ref()
                    .map(|_| "OfflineCacheCleaner { ... }"),
            )
            .field("sync", &self.sync)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        self.sync.validate()
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    event_buffer_size: Option<usize>,
    clock: Option<Arc<dyn Clock>>,
    offline_cleaner: Option<Arc<dyn OfflineCacheCleaner>>,
    sync: Option<SyncSettings>,
}

impl CoreConfigBuilder {
    /// Sets the SQLite database file (required).
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Overrides the time source (defaults to [`SystemClock`]).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Injects the download manager that removes offline audio for deleted tracks.
    pub fn offline_cleaner(mut self, cleaner: Arc<dyn OfflineCacheCleaner>) -> Self {
        self.offline_cleaner = Some(cleaner);
        self
    }

    pub fn sync_settings(mut self, settings: SyncSettings) -> Self {
        self.sync = Some(settings);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the database path is missing or any value
    /// is out of range.
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let config = CoreConfig {
            database_path,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            offline_cleaner: self.offline_cleaner,
            sync: self.sync.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{BridgeError, FixedClock, RemovedTrack};

    struct NoopCleaner;

    #[async_trait]
    impl OfflineCacheCleaner for NoopCleaner {
        async fn remove_offline_copies(
            &self,
            _source_id: &str,
            _removed: Vec<RemovedTrack>,
        ) -> std::result::Result<(), BridgeError> {
            Ok(())
        }
    }

    #[test]
    fn test_builder_requires_database_path() {
        let result = CoreConfig::builder().build();
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("Database path")));
    }

    #[test]
    fn test_builder_defaults() {
        let config = CoreConfig::builder()
            .database_path("/tmp/library.db")
            .build()
            .unwrap();

        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert_eq!(config.sync, SyncSettings::default());
        assert!(config.offline_cleaner.is_none());
        assert!(config.clock.unix_timestamp() > 0);
    }

    #[test]
    fn test_builder_with_collaborators() {
        let config = CoreConfig::builder()
            .database_path("/tmp/library.db")
            .clock(Arc::new(FixedClock::at(42)))
            .offline_cleaner(Arc::new(NoopCleaner))
            .event_buffer_size(16)
            .build()
            .unwrap();

        assert_eq!(config.clock.unix_timestamp(), 42);
        assert!(config.offline_cleaner.is_some());
        assert_eq!(config.event_buffer_size, 16);

        let debug = format!("{:?}", config);
        assert!(debug.contains("OfflineCacheCleaner { ... }"));
    }

    #[test]
    fn test_empty_database_path_rejected() {
        let result = CoreConfig::builder().database_path("").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_event_buffer_rejected() {
        let result = CoreConfig::builder()
            .database_path("/tmp/library.db")
            .event_buffer_size(0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_sync_settings_validation() {
        assert!(SyncSettings::default().validate().is_ok());
        assert!(SyncSettings::default()
            .with_progress_batch_size(0)
            .validate()
            .is_err());
        assert!(SyncSettings::default()
            .with_fetch_progress_cap(0.0)
            .validate()
            .is_err());
        assert!(SyncSettings::default()
            .with_fetch_progress_cap(1.5)
            .validate()
            .is_err());
        assert!(SyncSettings::default()
            .with_fetch_progress_cap(f64::NAN)
            .validate()
            .is_err());
        assert!(SyncSettings::default()
            .with_track_fetch_estimate(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_invalid_sync_settings_fail_build() {
        let result = CoreConfig::builder()
            .database_path("/tmp/library.db")
            .sync_settings(SyncSettings::default().with_estimator_tick(Duration::ZERO))
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
