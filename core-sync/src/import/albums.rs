//! Album phase

use super::{detect_change, non_blank, resolve_image_tag, EntityStats, LocalCatalog, NameIndex, PhaseContext};
use crate::progress::{stage, ALBUM_BAND};
use crate::Result;
use bridge_traits::AlbumRecord;
use core_library::models::normalize_name;
use core_library::{Album, LibraryTransaction};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Years outside this range are treated as unknown
const VALID_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

pub(crate) async fn import_albums(
    tx: &mut LibraryTransaction,
    catalog: &mut LocalCatalog,
    records: &[AlbumRecord],
    artists: &NameIndex,
    ctx: &PhaseContext<'_>,
) -> Result<EntityStats> {
    let mut by_remote: HashMap<String, String> = catalog
        .albums
        .values()
        .map(|a| (a.remote_id.clone(), a.id.clone()))
        .collect();

    let mut stats = EntityStats::default();
    let mut unlinked = 0usize;
    let total = records.len();

    for (position, record) in records.iter().enumerate() {
        let done = position + 1;
        if record.id.trim().is_empty() {
            warn!(name = %record.name, "Skipping album record without id");
            ctx.report(ALBUM_BAND, done, total, stage::ALBUMS);
            continue;
        }

        let existing = by_remote
            .get(&record.id)
            .and_then(|id| catalog.albums.get(id));
        let mut candidate = match existing {
            Some(album) => album.clone(),
            None => Album::new(ctx.source_id, &record.id, &record.name, ctx.now),
        };
        apply_album_record(&mut candidate, record, artists);
        if candidate.artist_id.is_none() && candidate.artist_name.is_some() {
            unlinked += 1;
        }

        let change = detect_change(existing, &mut candidate, ctx.now);
        if change.needs_write() {
            tx.upsert_album(&candidate).await?;
        }
        stats.record(change);

        by_remote.insert(record.id.clone(), candidate.id.clone());
        catalog.albums.insert(candidate.id.clone(), candidate);

        ctx.report(ALBUM_BAND, done, total, stage::ALBUMS);
    }

    if unlinked > 0 {
        debug!(unlinked, "Albums whose artist name matched no artist");
    }
    Ok(stats)
}

/// Overwrite an album's fields from its remote record.
///
/// The owning artist is looked up by the album artist name; an unknown name
/// leaves the album unlinked.
pub(crate) fn apply_album_record(album: &mut Album, record: &AlbumRecord, artists: &NameIndex) {
    album.title = record.name.clone();
    album.normalized_title = normalize_name(&record.name);
    album.sort_title = non_blank(record.sort_name.as_deref());
    album.production_year = record
        .production_year
        .filter(|year| VALID_YEARS.contains(year));
    album.image_tag = resolve_image_tag(&record.image_tags);
    album.artist_name = non_blank(record.album_artist.as_deref());
    album.artist_id = album
        .artist_name
        .as_deref()
        .and_then(|name| artists.resolve(name))
        .map(str::to_string);
}
