//! Genre phase

use super::{detect_change, EntityStats, LocalCatalog, PhaseContext};
use crate::progress::{stage, GENRE_BAND};
use crate::Result;
use bridge_traits::TrackRecord;
use core_library::genre::{self, genre_entries, UNKNOWN, UNKNOWN_KEY};
use core_library::{Genre, LibraryTransaction};
use std::collections::HashSet;

/// `(display, key)` for every genre referenced by `tracks`, plus Unknown.
///
/// The first spelling seen for a key is the display name.
pub(crate) fn referenced_genres(tracks: &[TrackRecord]) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for track in tracks {
        for (display, key) in genre_entries(&track.genres) {
            if seen.insert(key.clone()) {
                entries.push((display, key));
            }
        }
    }
    if seen.insert(UNKNOWN_KEY.to_string()) {
        entries.push((UNKNOWN.to_string(), UNKNOWN_KEY.to_string()));
    }

    entries
}

pub(crate) async fn import_genres(
    tx: &mut LibraryTransaction,
    catalog: &mut LocalCatalog,
    tracks: &[TrackRecord],
    ctx: &PhaseContext<'_>,
) -> Result<EntityStats> {
    let entries = referenced_genres(tracks);
    let mut stats = EntityStats::default();
    let total = entries.len();

    for (position, (display, key)) in entries.iter().enumerate() {
        let existing = catalog.genres.get(key);
        let mut candidate = match existing {
            Some(genre) => genre.clone(),
            None => Genre::new(ctx.source_id, display, key, ctx.now),
        };
        candidate.raw_name = display.clone();
        candidate.umbrella_name = genre::resolve(key).to_string();

        let change = detect_change(existing, &mut candidate, ctx.now);
        if change.needs_write() {
            tx.upsert_genre(&candidate).await?;
        }
        stats.record(change);
        catalog.genres.insert(key.clone(), candidate);

        ctx.report(GENRE_BAND, position + 1, total, stage::GENRES);
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::track_record;

    #[test]
    fn test_referenced_genres_union() {
        let mut first = track_record("t-1", "One");
        first.genres = vec!["Hip-Hop, Trip Hop".to_string()];
        let mut second = track_record("t-2", "Two");
        second.genres = vec!["hip hop".to_string(), "Jazz".to_string()];
        let untagged = track_record("t-3", "Three");

        let keys: Vec<(String, String)> = referenced_genres(&[first, second, untagged]);
        assert_eq!(
            keys,
            vec![
                ("Hip-Hop".to_string(), "hip hop".to_string()),
                ("Trip Hop".to_string(), "trip hop".to_string()),
                ("Jazz".to_string(), "jazz".to_string()),
                ("Unknown".to_string(), "unknown".to_string()),
            ]
        );
    }

    #[test]
    fn test_unknown_always_present() {
        assert_eq!(
            referenced_genres(&[]),
            vec![("Unknown".to_string(), "unknown".to_string())]
        );
    }
}
