//! Track phase

use super::{
    detect_change, non_blank, parse_server_date, ticks_to_seconds, EntityStats, LocalCatalog,
    NameIndex, PhaseContext,
};
use crate::progress::{stage, TRACK_BAND};
use crate::Result;
use bridge_traits::TrackRecord;
use core_library::genre::{classify_genres, UNKNOWN_KEY};
use core_library::models::normalize_name;
use core_library::{Album, Genre, LibraryTransaction, Track};
use std::collections::HashMap;
use tracing::warn;

/// Lookups a track record is linked through
pub(crate) struct TrackLinks<'a> {
    /// Remote album id to `(local album id, album artist id)`
    pub albums: &'a HashMap<String, (String, Option<String>)>,
    pub artists: &'a NameIndex,
    /// Genres by normalized name
    pub genres: &'a HashMap<String, Genre>,
}

pub(crate) fn album_links<'a>(
    albums: impl IntoIterator<Item = &'a Album>,
) -> HashMap<String, (String, Option<String>)> {
    albums
        .into_iter()
        .map(|a| (a.remote_id.clone(), (a.id.clone(), a.artist_id.clone())))
        .collect()
}

/// Overwrite a track's fields from its remote record.
///
/// Returns the ids of the genres the track belongs to, in classification order.
pub(crate) fn apply_track_record(
    track: &mut Track,
    record: &TrackRecord,
    links: &TrackLinks<'_>,
) -> Vec<String> {
    track.title = record.name.clone();
    track.normalized_title = normalize_name(&record.name);
    track.duration_secs = ticks_to_seconds(record.run_time_ticks);
    track.track_number = record.index_number;
    track.disc_number = record.parent_index_number;
    track.date_added = parse_server_date(record.date_created.as_deref());
    track.container = non_blank(record.container.as_deref());

    let user_data = record.user_data.clone().unwrap_or_default();
    track.play_count = user_data.play_count.unwrap_or(0).max(0);
    track.is_liked = user_data.is_favorite.unwrap_or(false);

    let album = record
        .album_id
        .as_deref()
        .and_then(|id| links.albums.get(id));
    track.album_id = album.map(|(id, _)| id.clone());
    track.artist_id = record
        .artists
        .first()
        .and_then(|name| links.artists.resolve(name))
        .map(str::to_string)
        .or_else(|| album.and_then(|(_, artist_id)| artist_id.clone()))
        .or_else(|| {
            record
                .album_artist
                .as_deref()
                .and_then(|name| links.artists.resolve(name))
                .map(str::to_string)
        });

    let classification = classify_genres(&record.genres);
    let mut genre_ids: Vec<String> = classification
        .normalized
        .iter()
        .filter_map(|key| links.genres.get(key).map(|g| g.id.clone()))
        .collect();
    if genre_ids.is_empty() {
        genre_ids.extend(links.genres.get(UNKNOWN_KEY).map(|g| g.id.clone()));
    }

    track.raw_genres = classification.raw;
    track.normalized_genres = classification.normalized;
    track.umbrella_genres = classification.umbrella;

    genre_ids
}

pub(crate) async fn import_tracks(
    tx: &mut LibraryTransaction,
    catalog: &mut LocalCatalog,
    records: &[TrackRecord],
    artists: &NameIndex,
    ctx: &PhaseContext<'_>,
) -> Result<EntityStats> {
    let albums = album_links(catalog.albums.values());
    let mut by_remote: HashMap<String, String> = catalog
        .tracks
        .values()
        .map(|t| (t.remote_id.clone(), t.id.clone()))
        .collect();

    let mut stats = EntityStats::default();
    let total = records.len();

    for (position, record) in records.iter().enumerate() {
        let done = position + 1;
        if record.id.trim().is_empty() {
            warn!(title = %record.name, "Skipping track record without id");
            ctx.report(TRACK_BAND, done, total, stage::TRACKS);
            continue;
        }

        let existing = by_remote
            .get(&record.id)
            .and_then(|id| catalog.tracks.get(id));
        let mut candidate = match existing {
            Some(track) => track.clone(),
            None => Track::new(ctx.source_id, &record.id, &record.name, ctx.now),
        };
        let links = TrackLinks {
            albums: &albums,
            artists,
            genres: &catalog.genres,
        };
        let genre_ids = apply_track_record(&mut candidate, record, &links);

        let change = detect_change(existing, &mut candidate, ctx.now);
        if change.needs_write() {
            tx.upsert_track(&candidate).await?;
            tx.replace_track_genres(&candidate.id, &genre_ids).await?;
        }
        stats.record(change);

        by_remote.insert(record.id.clone(), candidate.id.clone());
        catalog.tracks.insert(candidate.id.clone(), candidate);

        ctx.report(TRACK_BAND, done, total, stage::TRACKS);
    }

    Ok(stats)
}
