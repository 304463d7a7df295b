//! Playlist repository trait and implementation

use crate::error::Result;
use crate::models::{Playlist, Track};
use async_trait::async_trait;
use bridge_traits::ServerKind;
use sqlx::{query, query_as, SqliteConnection, SqlitePool};

/// Playlist repository interface for data access operations
#[async_trait]
pub trait PlaylistRepository: Send + Sync {
    /// Find a playlist by its ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Playlist>>;

    /// All playlists of a source ordered by name
    async fn list(&self, source_id: &str) -> Result<Vec<Playlist>>;

    /// Playlists the user may edit from the client
    async fn list_editable(&self, source_id: &str) -> Result<Vec<Playlist>>;

    /// Materialized tracks of a playlist in playlist order
    async fn tracks(&self, playlist_id: &str) -> Result<Vec<Track>>;

    /// Count a source's playlists
    async fn count(&self, source_id: &str) -> Result<i64>;
}

/// SQLite implementation of PlaylistRepository
pub struct SqlitePlaylistRepository {
    pool: SqlitePool,
}

impl SqlitePlaylistRepository {
    /// Create a new SqlitePlaylistRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlaylistRepository for SqlitePlaylistRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Playlist>> {
        let playlist = query_as::<_, Playlist>("SELECT * FROM playlists WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(playlist)
    }

    async fn list(&self, source_id: &str) -> Result<Vec<Playlist>> {
        let playlists = query_as::<_, Playlist>(
            "SELECT * FROM playlists WHERE source_id = ? ORDER BY name COLLATE NOCASE ASC",
        )
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(playlists)
    }

    async fn list_editable(&self, source_id: &str) -> Result<Vec<Playlist>> {
        let playlists = query_as::<_, Playlist>(
            r#"
            SELECT * FROM playlists
            WHERE source_id = ? AND is_read_only = 0
            ORDER BY name COLLATE NOCASE ASC
            "#,
        )
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(playlists)
    }

    async fn tracks(&self, playlist_id: &str) -> Result<Vec<Track>> {
        let tracks = query_as::<_, Track>(
            r#"
            SELECT t.* FROM tracks t
            INNER JOIN playlist_tracks pt ON pt.track_id = t.id
            WHERE pt.playlist_id = ?
            ORDER BY pt.position ASC
            "#,
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tracks)
    }

    async fn count(&self, source_id: &str) -> Result<i64> {
        let (count,): (i64,) = query_as("SELECT COUNT(*) FROM playlists WHERE source_id = ?")
            .bind(source_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

pub(crate) async fn list_for_origin(
    conn: &mut SqliteConnection,
    source_id: &str,
    origin: ServerKind,
) -> Result<Vec<Playlist>> {
    let playlists = query_as::<_, Playlist>(
        "SELECT * FROM playlists WHERE source_id = ? AND origin = ? ORDER BY id ASC",
    )
    .bind(source_id)
    .bind(origin.as_str())
    .fetch_all(conn)
    .await?;

    Ok(playlists)
}

/// Insert or overwrite a playlist keyed by its local id.
pub(crate) async fn upsert(conn: &mut SqliteConnection, playlist: &Playlist) -> Result<()> {
    query(
        r#"
        INSERT INTO playlists (
            id, source_id, remote_id, origin, name, summary, owner_id, is_read_only,
            path, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            summary = excluded.summary,
            owner_id = excluded.owner_id,
            is_read_only = excluded.is_read_only,
            path = excluded.path,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&playlist.id)
    .bind(&playlist.source_id)
    .bind(&playlist.remote_id)
    .bind(playlist.origin.as_str())
    .bind(&playlist.name)
    .bind(&playlist.summary)
    .bind(&playlist.owner_id)
    .bind(playlist.is_read_only)
    .bind(&playlist.path)
    .bind(playlist.created_at)
    .bind(playlist.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Replace the ordered membership of a playlist; positions start at 0.
pub(crate) async fn replace_tracks(
    conn: &mut SqliteConnection,
    playlist_id: &str,
    track_ids: &[String],
) -> Result<()> {
    query("DELETE FROM playlist_tracks WHERE playlist_id = ?")
        .bind(playlist_id)
        .execute(&mut *conn)
        .await?;

    for (position, track_id) in track_ids.iter().enumerate() {
        query("INSERT INTO playlist_tracks (playlist_id, position, track_id) VALUES (?, ?, ?)")
            .bind(playlist_id)
            .bind(position as i64)
            .bind(track_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

pub(crate) async fn delete_many(conn: &mut SqliteConnection, ids: &[String]) -> Result<u64> {
    super::delete_by_ids(conn, "playlists", ids).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, insert_test_source};
    use crate::repositories::track;

    async fn setup() -> (SqlitePool, String) {
        let pool = create_test_pool().await.unwrap();
        let source = insert_test_source(&pool, ServerKind::Emby).await.unwrap();
        (pool, source.id)
    }

    #[tokio::test]
    async fn test_upsert_and_list_playlists() {
        let (pool, source_id) = setup().await;
        let repo = SqlitePlaylistRepository::new(pool.clone());

        let mut file_backed = Playlist::new(&source_id, "pl-1", ServerKind::Emby, "Road Trip", 10);
        file_backed.is_read_only = true;
        file_backed.path = Some("/music/road trip.m3u".to_string());
        let editable = Playlist::new(&source_id, "pl-2", ServerKind::Emby, "Favourites", 10);

        let mut conn = pool.acquire().await.unwrap();
        upsert(&mut conn, &file_backed).await.unwrap();
        upsert(&mut conn, &editable).await.unwrap();

        let emby = list_for_origin(&mut conn, &source_id, ServerKind::Emby)
            .await
            .unwrap();
        assert_eq!(emby.len(), 2);
        let jellyfin = list_for_origin(&mut conn, &source_id, ServerKind::Jellyfin)
            .await
            .unwrap();
        assert!(jellyfin.is_empty());
        drop(conn);

        let names: Vec<String> = repo
            .list(&source_id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Favourites", "Road Trip"]);

        let editable_only = repo.list_editable(&source_id).await.unwrap();
        assert_eq!(editable_only, vec![editable]);
        assert_eq!(
            repo.find_by_id(&file_backed.id).await.unwrap().unwrap(),
            file_backed
        );
    }

    #[tokio::test]
    async fn test_replace_tracks_keeps_order() {
        let (pool, source_id) = setup().await;
        let repo = SqlitePlaylistRepository::new(pool.clone());

        let playlist = Playlist::new(&source_id, "pl-1", ServerKind::Emby, "Mix", 10);
        let tracks: Vec<Track> = ["b", "a", "c"]
            .iter()
            .map(|id| Track::new(&source_id, id, id, 10))
            .collect();

        let mut conn = pool.acquire().await.unwrap();
        upsert(&mut conn, &playlist).await.unwrap();
        for t in &tracks {
            track::upsert(&mut conn, t).await.unwrap();
        }
        let ids: Vec<String> = tracks.iter().map(|t| t.id.clone()).collect();
        replace_tracks(&mut conn, &playlist.id, &ids).await.unwrap();
        replace_tracks(&mut conn, &playlist.id, &ids[..2]).await.unwrap();
        drop(conn);

        let ordered: Vec<String> = repo
            .tracks(&playlist.id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.remote_id)
            .collect();
        assert_eq!(ordered, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_delete_many_playlists() {
        let (pool, source_id) = setup().await;
        let repo = SqlitePlaylistRepository::new(pool.clone());

        let playlist = Playlist::new(&source_id, "pl-1", ServerKind::Emby, "Gone", 10);
        let mut conn = pool.acquire().await.unwrap();
        upsert(&mut conn, &playlist).await.unwrap();
        assert_eq!(delete_many(&mut conn, &[playlist.id.clone()]).await.unwrap(), 1);
        drop(conn);

        assert_eq!(repo.count(&source_id).await.unwrap(), 0);
    }
}
