//! # Remote Catalog Fetcher
//!
//! Pulls the complete artist, album and track lists of one Source in
//! parallel. The three requests succeed together or the fetch fails as a
//! whole; a partial snapshot is never returned.
//!
//! The track list is by far the slowest request and the server gives no
//! progress for it, so an estimator task advances progress on a timer while
//! it is outstanding. The estimate is capped at
//! [`SyncSettings::fetch_progress_cap`] and stops the moment the track
//! request finishes.

use crate::progress::{stage, ProgressReporter};
use crate::Result;
use bridge_traits::{AlbumRecord, ArtistRecord, MediaServerClient, TrackRecord};
use core_runtime::config::SyncSettings;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument};

/// Everything the remote catalog contained at fetch time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteSnapshot {
    pub artists: Vec<ArtistRecord>,
    pub albums: Vec<AlbumRecord>,
    pub tracks: Vec<TrackRecord>,
}

impl RemoteSnapshot {
    /// Remote ids present in the snapshot, per entity kind
    pub fn remote_ids(&self) -> RemoteIds {
        RemoteIds {
            artists: self.artists.iter().map(|a| a.id.clone()).collect(),
            albums: self.albums.iter().map(|a| a.id.clone()).collect(),
            tracks: self.tracks.iter().map(|t| t.id.clone()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.artists.is_empty() && self.albums.is_empty() && self.tracks.is_empty()
    }
}

/// Remote id sets used to decide what no longer exists remotely
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteIds {
    pub artists: HashSet<String>,
    pub albums: HashSet<String>,
    pub tracks: HashSet<String>,
}

/// Fetches full snapshots through a [`MediaServerClient`]
pub struct CatalogFetcher {
    client: Arc<dyn MediaServerClient>,
    settings: SyncSettings,
}

impl CatalogFetcher {
    pub fn new(client: Arc<dyn MediaServerClient>, settings: SyncSettings) -> Self {
        Self { client, settings }
    }

    /// Fetch artists, albums and tracks concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Remote`](crate::SyncError::Remote) if any of the
    /// three requests fails.
    #[instrument(skip(self, progress))]
    pub async fn fetch_full_library(&self, progress: &ProgressReporter) -> Result<RemoteSnapshot> {
        let cap = self.settings.fetch_progress_cap;
        progress.report(0.0, stage::FETCHING);

        let tracks = async {
            let _estimator = FetchEstimator::spawn(
                progress.clone(),
                self.settings.track_fetch_estimate,
                self.settings.estimator_tick,
                cap,
            );
            self.client.fetch_tracks(None).await
        };

        let (artists, albums, tracks) = tokio::try_join!(
            self.client.fetch_artists(),
            self.client.fetch_albums(None),
            tracks
        )?;

        progress.report(cap, stage::FETCHING);
        info!(
            artists = artists.len(),
            albums = albums.len(),
            tracks = tracks.len(),
            "Fetched remote catalog"
        );

        Ok(RemoteSnapshot {
            artists,
            albums,
            tracks,
        })
    }
}

/// Timer-driven progress for the track request; aborted on drop
struct FetchEstimator {
    handle: JoinHandle<()>,
}

impl FetchEstimator {
    fn spawn(progress: ProgressReporter, estimate: Duration, tick: Duration, cap: f64) -> Self {
        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let ratio = estimated_ratio(started.elapsed(), estimate);
                progress.report(ratio * cap, stage::FETCHING);
                if ratio >= 1.0 {
                    debug!("Track fetch outlasted its estimate");
                    break;
                }
            }
        });

        Self { handle }
    }
}

impl Drop for FetchEstimator {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn estimated_ratio(elapsed: Duration, estimate: Duration) -> f64 {
    if estimate.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f64() / estimate.as_secs_f64()).min(1.0)
}
