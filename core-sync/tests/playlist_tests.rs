//! Integration tests for playlist mirroring

mod common;

use bridge_traits::ServerKind;
use common::*;
use core_library::repositories::{PlaylistRepository, SqlitePlaylistRepository};
use core_runtime::events::{CoreEvent, SyncEvent};
use core_sync::SyncError;

async fn seed_playlists(server: &FakeServer) {
    let mut foreign = playlist("p-emby", "From Emby", None);
    foreign.origin = Some(ServerKind::Emby);

    server
        .set_playlists(vec![
            playlist(
                "p-mix",
                "Evening Mix",
                Some("/config/data/playlists/Evening Mix/playlist.xml"),
            ),
            playlist("p-file", "Old Favourites", Some("/music/lists/favourites.m3u")),
            foreign,
        ])
        .await;
    server
        .set_playlist_items("p-mix", &["t-3", "t-gone", "t-1"])
        .await;
}

#[tokio::test]
async fn test_full_sync_mirrors_playlists() {
    let server = FakeServer::new();
    seed_small_library(&server).await;
    seed_playlists(&server).await;
    let h = harness(server).await;

    let job = h
        .coordinator
        .perform_full_sync(&h.source.id, None)
        .await
        .unwrap();
    assert_eq!(job.stats.unwrap().playlists_synced, 2);

    let repo = SqlitePlaylistRepository::new(h.pool.clone());
    let playlists = repo.list(&h.source.id).await.unwrap();
    assert_eq!(playlists.len(), 2);

    let mix = playlists.iter().find(|p| p.remote_id == "p-mix").unwrap();
    let file = playlists.iter().find(|p| p.remote_id == "p-file").unwrap();
    assert!(!mix.is_read_only);
    assert!(file.is_read_only);
    assert_eq!(mix.origin, ServerKind::Jellyfin);

    // Uncached tracks are skipped, order is kept
    let titles: Vec<String> = repo
        .tracks(&mix.id)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, vec!["Teardrop", "Sour Times"]);
    assert!(repo.tracks(&file.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_standalone_sync_deletes_missing_playlists() {
    let server = FakeServer::new();
    seed_small_library(&server).await;
    seed_playlists(&server).await;
    let h = harness(server.clone()).await;

    h.coordinator
        .perform_full_sync(&h.source.id, None)
        .await
        .unwrap();

    server
        .set_playlists(vec![playlist(
            "p-mix",
            "Evening Mix (edited)",
            Some("/config/data/playlists/Evening Mix/playlist.xml"),
        )])
        .await;
    h.clock.advance(30);
    let mut rx = h.bus.subscribe();

    let stats = h.coordinator.sync_playlists(&h.source.id).await.unwrap();
    assert_eq!(stats.upserted, 1);
    assert_eq!(stats.deleted, 1);

    let repo = SqlitePlaylistRepository::new(h.pool.clone());
    let playlists = repo.list(&h.source.id).await.unwrap();
    assert_eq!(playlists.len(), 1);
    assert_eq!(playlists[0].name, "Evening Mix (edited)");
    assert_eq!(playlists[0].updated_at, START + 30);

    let synced = std::iter::from_fn(|| rx.try_recv().ok()).find_map(|event| match event {
        CoreEvent::Sync(SyncEvent::PlaylistsSynced {
            upserted, deleted, ..
        }) => Some((upserted, deleted)),
        _ => None,
    });
    assert_eq!(synced, Some((1, 1)));
}

#[tokio::test]
async fn test_emby_source_keeps_only_emby_playlists() {
    let server = FakeServer::new();
    seed_playlists(&server).await;
    let h = harness_for(server, ServerKind::Emby).await;

    let stats = h.coordinator.sync_playlists(&h.source.id).await.unwrap();
    // Untagged records belong to the queried server
    assert_eq!(stats.upserted, 3);
    assert_eq!(stats.skipped, 0);

    let repo = SqlitePlaylistRepository::new(h.pool.clone());
    let playlists = repo.list(&h.source.id).await.unwrap();
    assert!(playlists.iter().all(|p| p.origin == ServerKind::Emby));
    // Emby treats every playlist file as read-only
    let file = playlists.iter().find(|p| p.remote_id == "p-file").unwrap();
    assert!(file.is_read_only);
}

#[tokio::test]
async fn test_playlist_sync_does_not_take_the_sync_slot() {
    let server = FakeServer::new();
    seed_playlists(&server).await;
    let h = harness(server).await;

    h.coordinator.sync_playlists(&h.source.id).await.unwrap();
    assert!(!h.coordinator.is_syncing(&h.source.id));

    let err = h.coordinator.sync_playlists("unknown").await.unwrap_err();
    assert!(matches!(err, SyncError::ClientNotRegistered { .. }));
}
