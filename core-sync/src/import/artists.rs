//! Artist phase

use super::{detect_change, non_blank, resolve_image_tag, EntityStats, LocalCatalog, NameIndex, PhaseContext};
use crate::progress::{stage, ARTIST_BAND};
use crate::Result;
use bridge_traits::ArtistRecord;
use core_library::models::normalize_name;
use core_library::{Artist, LibraryTransaction};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

/// Upsert every artist record and return the name index used by later phases.
///
/// The index holds only artists that carry a remote id; placeholders still
/// unresolved after this phase are left for orphan cleanup.
pub(crate) async fn import_artists(
    tx: &mut LibraryTransaction,
    catalog: &mut LocalCatalog,
    records: &[ArtistRecord],
    ctx: &PhaseContext<'_>,
) -> Result<(EntityStats, NameIndex)> {
    let mut by_remote: HashMap<String, String> = catalog
        .artists
        .values()
        .filter_map(|a| {
            a.remote_id
                .as_ref()
                .filter(|r| !r.is_empty())
                .map(|r| (r.clone(), a.id.clone()))
        })
        .collect();
    let mut placeholders = placeholders_by_name(catalog);

    let mut stats = EntityStats::default();
    let mut index = NameIndex::new();
    let total = records.len();

    for (position, record) in records.iter().enumerate() {
        let done = position + 1;
        if record.id.trim().is_empty() || record.name.trim().is_empty() {
            warn!(remote_id = %record.id, "Skipping artist record without id or name");
            ctx.report(ARTIST_BAND, done, total, stage::ARTISTS);
            continue;
        }

        let existing_id = by_remote.get(&record.id).cloned().or_else(|| {
            let adopted = placeholders
                .get_mut(&normalize_name(&record.name))
                .and_then(VecDeque::pop_front);
            if adopted.is_some() {
                debug!(name = %record.name, remote_id = %record.id, "Resolved placeholder artist");
            }
            adopted
        });
        let existing = existing_id.as_ref().and_then(|id| catalog.artists.get(id));

        let mut candidate = match existing {
            Some(artist) => artist.clone(),
            None => Artist::new(ctx.source_id, &record.id, &record.name, ctx.now),
        };
        apply_artist_record(&mut candidate, record);

        let change = detect_change(existing, &mut candidate, ctx.now);
        if change.needs_write() {
            tx.upsert_artist(&candidate).await?;
        }
        stats.record(change);

        by_remote.insert(record.id.clone(), candidate.id.clone());
        index.insert_artist(&candidate);
        catalog.artists.insert(candidate.id.clone(), candidate);

        ctx.report(ARTIST_BAND, done, total, stage::ARTISTS);
    }

    debug!(
        added = stats.added,
        updated = stats.updated,
        unchanged = stats.unchanged,
        "Artist phase finished"
    );
    Ok((stats, index))
}

fn apply_artist_record(artist: &mut Artist, record: &ArtistRecord) {
    artist.remote_id = Some(record.id.clone());
    artist.name = record.name.trim().to_string();
    artist.normalized_name = normalize_name(&record.name);
    artist.sort_name = non_blank(record.sort_name.as_deref());
    artist.image_tag = resolve_image_tag(&record.image_tags);
}

/// Placeholder ids grouped by normalized name, oldest first
fn placeholders_by_name(catalog: &LocalCatalog) -> HashMap<String, VecDeque<String>> {
    let mut pending: Vec<&Artist> = catalog
        .artists
        .values()
        .filter(|a| a.is_placeholder())
        .collect();
    pending.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));

    let mut grouped: HashMap<String, VecDeque<String>> = HashMap::new();
    for artist in pending {
        grouped
            .entry(artist.normalized_name.clone())
            .or_default()
            .push_back(artist.id.clone());
    }
    grouped
}
