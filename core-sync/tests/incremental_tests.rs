//! Integration tests for incremental metadata sync
//!
//! These tests verify:
//! - Placeholder artists are created for names the cache does not know
//! - Missing albums are fetched by id
//! - A later full sync adopts the placeholders instead of duplicating artists

mod common;

use common::*;
use core_library::{Artist, LibraryTransaction};
use core_runtime::events::{CoreEvent, LibraryEvent};
use core_sync::LocalCatalog;

async fn cached(h: &Harness) -> LocalCatalog {
    let mut tx = LibraryTransaction::begin(&h.pool).await.unwrap();
    let catalog = LocalCatalog::load(&mut tx, &h.source.id).await.unwrap();
    tx.rollback().await.unwrap();
    catalog
}

#[tokio::test]
async fn test_placeholders_then_full_sync_reconciles() {
    let server = FakeServer::new();
    server
        .set_albums(vec![album("al-7", "Moon Safari", Some("AIR"))])
        .await;
    let h = harness(server.clone()).await;
    let mut rx = h.bus.subscribe();

    let surfaced = vec![
        album_track("t-7", "La Femme d'Argent", "al-7", "AIR", &["Downtempo"]),
        album_track("t-8", "Sexy Boy", "al-7", "air", &["Electronic"]),
    ];
    let stats = h
        .incremental
        .sync_missing_metadata(&h.source.id, &surfaced)
        .await
        .unwrap();
    assert_eq!(stats.albums_fetched, 1);
    assert_eq!(stats.tracks_added, 2);
    assert_eq!(stats.placeholders_created, vec!["AIR"]);

    let created = std::iter::from_fn(|| rx.try_recv().ok()).find_map(|event| match event {
        CoreEvent::Library(LibraryEvent::PlaceholderArtistsCreated { names, .. }) => Some(names),
        _ => None,
    });
    assert_eq!(created, Some(vec!["AIR".to_string()]));

    let partial = cached(&h).await;
    let placeholder = partial.artists.values().next().cloned().unwrap();
    assert!(placeholder.is_placeholder());
    assert!(partial
        .tracks
        .values()
        .all(|t| t.artist_id.as_deref() == Some(placeholder.id.as_str())));

    // The server now lists the artist; the full sync adopts the placeholder
    server.set_artists(vec![artist("ar-air", "Air")]).await;
    server
        .set_tracks(vec![
            album_track("t-7", "La Femme d'Argent", "al-7", "AIR", &["Downtempo"]),
            album_track("t-8", "Sexy Boy", "al-7", "air", &["Electronic"]),
        ])
        .await;
    h.clock.advance(120);
    h.coordinator
        .perform_full_sync(&h.source.id, None)
        .await
        .unwrap();

    let full = cached(&h).await;
    assert_eq!(full.artists.len(), 1);
    let adopted = &full.artists[&placeholder.id];
    assert_eq!(adopted.remote_id.as_deref(), Some("ar-air"));
    assert_eq!(adopted.name, "Air");
    assert_eq!(adopted.created_at, placeholder.created_at);
    assert!(full
        .tracks
        .values()
        .all(|t| t.artist_id.as_deref() == Some(placeholder.id.as_str())));
}

#[tokio::test]
async fn test_unresolved_placeholders_are_removed_by_full_sync() {
    let server = FakeServer::new();
    let h = harness(server.clone()).await;

    let mut lone = track("t-1", "Untitled");
    lone.artists = vec!["Ghost Writer".to_string()];
    h.incremental
        .sync_missing_metadata(&h.source.id, &[lone.clone()])
        .await
        .unwrap();
    assert_eq!(cached(&h).await.artists.len(), 1);

    server.set_tracks(vec![lone]).await;
    h.coordinator
        .perform_full_sync(&h.source.id, None)
        .await
        .unwrap();

    let full = cached(&h).await;
    assert!(full.artists.is_empty());
    assert_eq!(full.tracks.len(), 1);
    assert_eq!(full.tracks.values().next().unwrap().artist_id, None);
}

#[tokio::test]
async fn test_incremental_never_deletes() {
    let server = FakeServer::new();
    seed_small_library(&server).await;
    let h = harness(server).await;

    h.coordinator
        .perform_full_sync(&h.source.id, None)
        .await
        .unwrap();
    let before = cached(&h).await;

    let stats = h
        .incremental
        .sync_missing_metadata(&h.source.id, &[track("t-new", "Glory Box")])
        .await
        .unwrap();
    assert_eq!(stats.tracks_added, 1);
    assert!(stats.placeholders_created.is_empty());

    let after = cached(&h).await;
    assert_eq!(after.tracks.len(), before.tracks.len() + 1);
    assert_eq!(after.artists.len(), before.artists.len());
    assert_eq!(after.albums.len(), before.albums.len());
    assert!(after.artists.values().all(|a| !Artist::is_placeholder(a)));
}
