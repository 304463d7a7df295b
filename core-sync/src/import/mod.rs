//! # Snapshot Import
//!
//! Applies a [`RemoteSnapshot`] to the local cache in four ordered phases,
//! all inside the caller's [`LibraryTransaction`]:
//!
//! 1. **Artists** - find or create by remote id, adopting a placeholder of
//!    the same name when no row carries the remote id yet
//! 2. **Albums** - find or create by remote id, linked to an artist by name
//! 3. **Genres** - one row per normalized key across every track
//! 4. **Tracks** - find or create by remote id, linked to album, artist and genres
//!
//! Records whose domain fields did not change are not rewritten. The phases
//! keep a [`LocalCatalog`] current as they go, which orphan cleanup then
//! compares against the snapshot.

mod albums;
mod artists;
mod genres;
mod index;
mod tracks;

pub use index::NameIndex;

pub(crate) use albums::apply_album_record;
pub(crate) use genres::referenced_genres;
pub(crate) use tracks::{album_links, apply_track_record, TrackLinks};

use crate::fetcher::RemoteSnapshot;
use crate::progress::{ProgressBand, ProgressReporter};
use crate::Result;
use bridge_traits::{Clock, ImageTags};
use chrono::DateTime;
use core_library::{Album, Artist, Genre, LibraryTransaction, Track};
use core_runtime::config::SyncSettings;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// Image kinds tried before falling back to the lexically first one
const PREFERRED_IMAGE_KINDS: [&str; 2] = ["Primary", "Thumb"];

/// Server durations are expressed in 100ns ticks
const TICKS_PER_SECOND: f64 = 10_000_000.0;

/// Local state of one Source, kept current while the phases run
#[derive(Debug, Clone, Default)]
pub struct LocalCatalog {
    /// Artists by local id
    pub artists: HashMap<String, Artist>,
    /// Albums by local id
    pub albums: HashMap<String, Album>,
    /// Genres by normalized name
    pub genres: HashMap<String, Genre>,
    /// Tracks by local id
    pub tracks: HashMap<String, Track>,
}

impl LocalCatalog {
    pub async fn load(tx: &mut LibraryTransaction, source_id: &str) -> Result<Self> {
        let artists = tx.artists(source_id).await?;
        let albums = tx.albums(source_id).await?;
        let genres = tx.genres(source_id).await?;
        let tracks = tx.tracks(source_id).await?;

        Ok(Self {
            artists: artists.into_iter().map(|a| (a.id.clone(), a)).collect(),
            albums: albums.into_iter().map(|a| (a.id.clone(), a)).collect(),
            genres: genres
                .into_iter()
                .map(|g| (g.normalized_name.clone(), g))
                .collect(),
            tracks: tracks.into_iter().map(|t| (t.id.clone(), t)).collect(),
        })
    }
}

/// Per-entity write counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityStats {
    pub added: u64,
    pub updated: u64,
    pub unchanged: u64,
}

impl EntityStats {
    pub(crate) fn record(&mut self, change: Change) {
        match change {
            Change::Added => self.added += 1,
            Change::Updated => self.updated += 1,
            Change::Unchanged => self.unchanged += 1,
        }
    }
}

/// Write counts of a whole import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub artists: EntityStats,
    pub albums: EntityStats,
    pub genres: EntityStats,
    pub tracks: EntityStats,
}

impl ImportStats {
    fn all(&self) -> [EntityStats; 4] {
        [self.artists, self.albums, self.genres, self.tracks]
    }

    pub fn added(&self) -> u64 {
        self.all().iter().map(|s| s.added).sum()
    }

    pub fn updated(&self) -> u64 {
        self.all().iter().map(|s| s.updated).sum()
    }

    pub fn unchanged(&self) -> u64 {
        self.all().iter().map(|s| s.unchanged).sum()
    }
}

/// Result of [`CatalogImporter::import`]
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub stats: ImportStats,
    /// Local state after the four phases
    pub catalog: LocalCatalog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Change {
    Added,
    Updated,
    Unchanged,
}

impl Change {
    pub(crate) fn needs_write(self) -> bool {
        self != Change::Unchanged
    }
}

pub(crate) trait Timestamped {
    fn touch(&mut self, now: i64);
}

macro_rules! impl_timestamped {
    ($($ty:ty),*) => {
        $(impl Timestamped for $ty {
            fn touch(&mut self, now: i64) {
                self.updated_at = now;
            }
        })*
    };
}

impl_timestamped!(Artist, Album, Genre, Track);

/// Classify `candidate` against the stored row it was derived from.
///
/// A candidate must start as a clone of `existing` (or a fresh row), so equal
/// means no domain field moved. Changed rows get `updated_at = now`.
pub(crate) fn detect_change<T: PartialEq + Timestamped>(
    existing: Option<&T>,
    candidate: &mut T,
    now: i64,
) -> Change {
    match existing {
        None => Change::Added,
        Some(current) if current == candidate => Change::Unchanged,
        Some(_) => {
            candidate.touch(now);
            Change::Updated
        }
    }
}

/// Shared state of one import run
pub(crate) struct PhaseContext<'a> {
    pub source_id: &'a str,
    pub now: i64,
    pub batch_size: usize,
    pub progress: &'a ProgressReporter,
}

impl PhaseContext<'_> {
    /// Report every `batch_size` records and once at the end of a phase
    pub fn report(&self, band: ProgressBand, done: usize, total: usize, stage: &str) {
        if done == total || done % self.batch_size.max(1) == 0 {
            self.progress.report(band.batch(done, total), stage);
        }
    }
}

/// Runs the four import phases for one Source
pub struct CatalogImporter {
    source_id: String,
    clock: Arc<dyn Clock>,
    batch_size: usize,
}

impl CatalogImporter {
    pub fn new(source_id: impl Into<String>, clock: Arc<dyn Clock>, settings: &SyncSettings) -> Self {
        Self {
            source_id: source_id.into(),
            clock,
            batch_size: settings.progress_batch_size,
        }
    }

    /// Upsert every artist, album, genre and track of `snapshot`.
    ///
    /// Nothing is deleted here; see [`OrphanCleanup`](crate::cleanup::OrphanCleanup).
    #[instrument(skip_all, fields(source_id = %self.source_id))]
    pub async fn import(
        &self,
        tx: &mut LibraryTransaction,
        snapshot: &RemoteSnapshot,
        progress: &ProgressReporter,
    ) -> Result<ImportOutcome> {
        let mut catalog = LocalCatalog::load(tx, &self.source_id).await?;
        let ctx = PhaseContext {
            source_id: &self.source_id,
            now: self.clock.unix_timestamp(),
            batch_size: self.batch_size,
            progress,
        };

        let (artist_stats, artist_index) =
            artists::import_artists(tx, &mut catalog, &snapshot.artists, &ctx).await?;
        let album_stats =
            albums::import_albums(tx, &mut catalog, &snapshot.albums, &artist_index, &ctx).await?;
        let genre_stats = genres::import_genres(tx, &mut catalog, &snapshot.tracks, &ctx).await?;
        let track_stats =
            tracks::import_tracks(tx, &mut catalog, &snapshot.tracks, &artist_index, &ctx).await?;

        let stats = ImportStats {
            artists: artist_stats,
            albums: album_stats,
            genres: genre_stats,
            tracks: track_stats,
        };
        info!(
            added = stats.added(),
            updated = stats.updated(),
            unchanged = stats.unchanged(),
            "Imported remote snapshot"
        );

        Ok(ImportOutcome { stats, catalog })
    }
}

/// Pick `Primary`, then `Thumb`, then the lexically first image kind
pub(crate) fn resolve_image_tag(tags: &ImageTags) -> Option<String> {
    let usable = |kind: &str| tags.get(kind).filter(|tag| !tag.trim().is_empty());

    PREFERRED_IMAGE_KINDS
        .iter()
        .find_map(|kind| usable(*kind))
        .or_else(|| {
            let mut kinds: Vec<&String> = tags.keys().collect();
            kinds.sort();
            kinds.into_iter().find_map(|kind| usable(kind.as_str()))
        })
        .cloned()
}

/// Duration in seconds; missing, negative or non-finite values become 0
pub(crate) fn ticks_to_seconds(ticks: Option<i64>) -> f64 {
    let seconds = ticks.unwrap_or(0) as f64 / TICKS_PER_SECOND;
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}

/// Unix seconds of an RFC 3339 server date
pub(crate) fn parse_server_date(value: Option<&str>) -> Option<i64> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|dt| dt.timestamp())
}

/// Trimmed text, or `None` when blank
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> ImageTags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_image_tag_preference() {
        assert_eq!(
            resolve_image_tag(&tags(&[("Thumb", "t"), ("Primary", "p")])),
            Some("p".to_string())
        );
        assert_eq!(
            resolve_image_tag(&tags(&[("Thumb", "t"), ("Backdrop", "b")])),
            Some("t".to_string())
        );
        assert_eq!(
            resolve_image_tag(&tags(&[("Logo", "l"), ("Banner", "b"), ("Primary", "")])),
            Some("b".to_string())
        );
        assert_eq!(resolve_image_tag(&ImageTags::new()), None);
    }

    #[test]
    fn test_ticks_to_seconds() {
        assert_eq!(ticks_to_seconds(Some(2_455_000_000)), 245.5);
        assert_eq!(ticks_to_seconds(None), 0.0);
        assert_eq!(ticks_to_seconds(Some(-10)), 0.0);
        assert_eq!(ticks_to_seconds(Some(0)), 0.0);
    }

    #[test]
    fn test_parse_server_date() {
        assert_eq!(
            parse_server_date(Some("2023-05-01T12:00:00.0000000Z")),
            Some(1_682_942_400)
        );
        assert_eq!(parse_server_date(Some("2023-05-01T14:00:00+02:00")), Some(1_682_942_400));
        assert_eq!(parse_server_date(Some("last tuesday")), None);
        assert_eq!(parse_server_date(Some("  ")), None);
        assert_eq!(parse_server_date(None), None);
    }

    #[test]
    fn test_detect_change_stamps_updates_only() {
        let stored = Artist::new("src", "ar-1", "Tricky", 10);

        let mut same = stored.clone();
        assert_eq!(detect_change(Some(&stored), &mut same, 50), Change::Unchanged);
        assert_eq!(same.updated_at, 10);

        let mut renamed = stored.clone();
        renamed.name = "Tricky Kid".to_string();
        assert_eq!(detect_change(Some(&stored), &mut renamed, 50), Change::Updated);
        assert_eq!(renamed.updated_at, 50);
        assert_eq!(renamed.created_at, 10);

        let mut fresh = Artist::new("src", "ar-2", "Roni Size", 50);
        assert_eq!(detect_change(None, &mut fresh, 50), Change::Added);
        assert!(Change::Added.needs_write() && !Change::Unchanged.needs_write());
    }

    #[test]
    fn test_import_stats_totals() {
        let stats = ImportStats {
            artists: EntityStats {
                added: 2,
                updated: 0,
                unchanged: 1,
            },
            tracks: EntityStats {
                added: 5,
                updated: 1,
                unchanged: 0,
            },
            ..Default::default()
        };
        assert_eq!(stats.added(), 7);
        assert_eq!(stats.updated(), 1);
        assert_eq!(stats.unchanged(), 1);
    }
}
