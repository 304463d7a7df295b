//! # Sync Progress Reporting
//!
//! A full sync reports one overall fraction in `[0, 1]` plus a stage label.
//! Each phase owns a [`ProgressBand`] of that range and maps its local
//! progress onto it. [`ProgressReporter`] clamps every report so the fraction
//! never moves backwards, even when the fetch estimator and the import
//! phases report from different tasks.

use crate::job::fraction_to_percent;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use std::sync::{Arc, Mutex, PoisonError};

/// Observer invoked with `(fraction, stage)` on every report.
///
/// It may read the reporter back (`fraction()`, `stage()`) but must not call
/// `report()` itself.
pub type ProgressCallback = Arc<dyn Fn(f64, &str) + Send + Sync>;

/// Stage labels reported during a sync run
pub mod stage {
    pub const STARTING: &str = "Starting sync";
    pub const FETCHING: &str = "Fetching library";
    pub const ARTISTS: &str = "Importing artists";
    pub const ALBUMS: &str = "Importing albums";
    pub const GENRES: &str = "Importing genres";
    pub const TRACKS: &str = "Importing tracks";
    pub const CLEANUP: &str = "Removing deleted items";
    pub const PLAYLISTS: &str = "Syncing playlists";
    pub const COMPLETED: &str = "Completed";
}

/// Slice of overall progress owned by one phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressBand {
    pub start: f64,
    pub end: f64,
}

impl ProgressBand {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Overall fraction for phase-local progress `local` in `[0, 1]`
    pub fn at(&self, local: f64) -> f64 {
        if local.is_nan() || local <= 0.0 {
            return self.start;
        }
        if local >= 1.0 {
            return self.end;
        }
        self.start + (self.end - self.start) * local
    }

    /// Overall fraction after `done` of `total` records
    pub fn batch(&self, done: usize, total: usize) -> f64 {
        if total == 0 {
            return self.end;
        }
        self.at(done as f64 / total as f64)
    }
}

/// The fetch band ends at the configured cap; see `SyncSettings::fetch_progress_cap`
pub const ARTIST_BAND: ProgressBand = ProgressBand::new(0.30, 0.45);
pub const ALBUM_BAND: ProgressBand = ProgressBand::new(0.45, 0.60);
pub const GENRE_BAND: ProgressBand = ProgressBand::new(0.60, 0.65);
pub const TRACK_BAND: ProgressBand = ProgressBand::new(0.65, 0.90);
pub const CLEANUP_BAND: ProgressBand = ProgressBand::new(0.90, 0.95);
pub const PLAYLIST_BAND: ProgressBand = ProgressBand::new(0.95, 1.0);

#[derive(Clone)]
struct ProgressEvents {
    bus: EventBus,
    job_id: String,
    source_id: String,
}

struct ReporterState {
    fraction: f64,
    stage: String,
}

/// What observers have been handed so far
struct Delivered {
    fraction: f64,
    last_percent: Option<u8>,
}

/// Shared, monotonic progress sink for one sync run.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ProgressReporter {
    state: Arc<Mutex<ReporterState>>,
    delivered: Arc<Mutex<Delivered>>,
    callback: Option<ProgressCallback>,
    events: Option<ProgressEvents>,
}

impl ProgressReporter {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ReporterState {
                fraction: 0.0,
                stage: stage::STARTING.to_string(),
            })),
            delivered: Arc::new(Mutex::new(Delivered {
                fraction: 0.0,
                last_percent: None,
            })),
            callback,
            events: None,
        }
    }

    /// Reporter that only tracks state
    pub fn silent() -> Self {
        Self::new(None)
    }

    /// Also publish `SyncEvent::Progress` whenever the percentage or stage changes
    pub fn with_events(
        mut self,
        bus: EventBus,
        job_id: impl Into<String>,
        source_id: impl Into<String>,
    ) -> Self {
        self.events = Some(ProgressEvents {
            bus,
            job_id: job_id.into(),
            source_id: source_id.into(),
        });
        self
    }

    /// Report overall progress. Values below the last report are raised to it.
    pub fn report(&self, fraction: f64, stage: &str) {
        let requested = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };

        let stage_changed = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.fraction = requested.max(state.fraction);
            let changed = state.stage != stage;
            if changed {
                state.stage = stage.to_string();
            }
            changed
        };

        // Observers run outside the state lock; this lock keeps concurrent
        // reports reaching them in order.
        let mut delivered = self.delivered.lock().unwrap_or_else(PoisonError::into_inner);
        let fraction = requested.max(delivered.fraction);
        delivered.fraction = fraction;

        if let Some(callback) = &self.callback {
            callback(fraction, stage);
        }

        let percent = fraction_to_percent(fraction);
        if stage_changed || delivered.last_percent != Some(percent) {
            delivered.last_percent = Some(percent);
            if let Some(events) = &self.events {
                events
                    .bus
                    .emit(CoreEvent::Sync(SyncEvent::Progress {
                        job_id: events.job_id.clone(),
                        source_id: events.source_id.clone(),
                        percent,
                        stage: stage.to_string(),
                    }))
                    .ok();
            }
        }
    }

    pub fn fraction(&self) -> f64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fraction
    }

    /// Stage label of the most recent report
    pub fn stage(&self) -> String {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stage
            .clone()
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("fraction", &self.fraction())
            .field("stage", &self.stage())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording() -> (ProgressReporter, Arc<Mutex<Vec<(f64, String)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ProgressCallback = Arc::new(move |fraction: f64, stage: &str| {
            sink.lock().unwrap().push((fraction, stage.to_string()));
        });
        (ProgressReporter::new(Some(callback)), seen)
    }

    #[test]
    fn test_band_mapping() {
        assert_eq!(ALBUM_BAND.at(0.0), 0.45);
        assert!((ALBUM_BAND.at(0.5) - 0.525).abs() < 1e-9);
        assert_eq!(ALBUM_BAND.at(7.0), 0.60);
        assert_eq!(TRACK_BAND.batch(0, 0), 0.90);
        assert_eq!(TRACK_BAND.batch(5, 5), 0.90);
    }

    #[test]
    fn test_reports_never_move_backwards() {
        let (reporter, seen) = recording();
        reporter.report(0.2, stage::FETCHING);
        reporter.report(0.1, stage::FETCHING);
        reporter.report(0.5, stage::ALBUMS);
        reporter.report(f64::NAN, stage::ALBUMS);

        let fractions: Vec<f64> = seen.lock().unwrap().iter().map(|(f, _)| *f).collect();
        assert_eq!(fractions, vec![0.2, 0.2, 0.5, 0.5]);
        assert_eq!(reporter.stage(), stage::ALBUMS);
    }

    #[test]
    fn test_callback_can_read_reporter_back() {
        let slot: Arc<std::sync::OnceLock<ProgressReporter>> = Arc::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let (reader, sink) = (Arc::clone(&slot), Arc::clone(&seen));
        let callback: ProgressCallback = Arc::new(move |_fraction: f64, _stage: &str| {
            if let Some(reporter) = reader.get() {
                sink.lock().unwrap().push((reporter.fraction(), reporter.stage()));
            }
        });
        let reporter = ProgressReporter::new(Some(callback));
        assert!(slot.set(reporter.clone()).is_ok());

        reporter.report(0.4, stage::ARTISTS);
        reporter.report(0.3, stage::ALBUMS);

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (0.4, stage::ARTISTS.to_string()),
                (0.4, stage::ALBUMS.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_progress_events_only_on_change() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let reporter = ProgressReporter::silent().with_events(bus, "job-1", "src-1");

        reporter.report(0.101, stage::FETCHING);
        reporter.report(0.102, stage::FETCHING);
        reporter.report(0.30, stage::ARTISTS);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(rx.try_recv().is_err());

        match (first, second) {
            (
                CoreEvent::Sync(SyncEvent::Progress { percent: p1, .. }),
                CoreEvent::Sync(SyncEvent::Progress {
                    percent: p2,
                    stage: label,
                    ..
                }),
            ) => {
                assert_eq!(p1, 10);
                assert_eq!(p2, 30);
                assert_eq!(label, stage::ARTISTS);
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }
}
