//! Track repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::Track;
use crate::repositories::{Page, PageRequest};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{query, query_as, SqliteConnection, SqlitePool};

/// Track repository interface for data access operations
#[async_trait]
pub trait TrackRepository: Send + Sync {
    /// Find a track by its ID
    ///
    /// # Returns
    /// - `Ok(Some(track))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn find_by_id(&self, id: &str) -> Result<Option<Track>>;

    /// Find a track by the server's identifier
    async fn find_by_remote_id(&self, source_id: &str, remote_id: &str) -> Result<Option<Track>>;

    /// Query a source's tracks ordered by title
    async fn query(&self, source_id: &str, page_request: PageRequest) -> Result<Page<Track>>;

    /// All tracks of an album in disc and track order
    async fn query_by_album(&self, album_id: &str) -> Result<Vec<Track>>;

    /// Query tracks linked to an artist
    async fn query_by_artist(
        &self,
        artist_id: &str,
        page_request: PageRequest,
    ) -> Result<Page<Track>>;

    /// Query tracks associated with a genre
    async fn query_by_genre(&self, genre_id: &str, page_request: PageRequest)
        -> Result<Page<Track>>;

    /// Count a source's tracks
    async fn count(&self, source_id: &str) -> Result<i64>;
}

/// SQLite implementation of TrackRepository
pub struct SqliteTrackRepository {
    pool: SqlitePool,
}

impl SqliteTrackRepository {
    /// Create a new SqliteTrackRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrackRepository for SqliteTrackRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Track>> {
        let track = query_as::<_, Track>("SELECT * FROM tracks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(track)
    }

    async fn find_by_remote_id(&self, source_id: &str, remote_id: &str) -> Result<Option<Track>> {
        let track =
            query_as::<_, Track>("SELECT * FROM tracks WHERE source_id = ? AND remote_id = ?")
                .bind(source_id)
                .bind(remote_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(track)
    }

    async fn query(&self, source_id: &str, page_request: PageRequest) -> Result<Page<Track>> {
        let total = self.count(source_id).await?;

        let tracks = query_as::<_, Track>(
            r#"
            SELECT * FROM tracks
            WHERE source_id = ?
            ORDER BY title COLLATE NOCASE ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(source_id)
        .bind(page_request.limit())
        .bind(page_request.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(tracks, total as u64, page_request))
    }

    async fn query_by_album(&self, album_id: &str) -> Result<Vec<Track>> {
        let tracks = query_as::<_, Track>(
            r#"
            SELECT * FROM tracks
            WHERE album_id = ?
            ORDER BY COALESCE(disc_number, 1) ASC, track_number ASC, title ASC
            "#,
        )
        .bind(album_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tracks)
    }

    async fn query_by_artist(
        &self,
        artist_id: &str,
        page_request: PageRequest,
    ) -> Result<Page<Track>> {
        let (total,): (i64,) = query_as("SELECT COUNT(*) FROM tracks WHERE artist_id = ?")
            .bind(artist_id)
            .fetch_one(&self.pool)
            .await?;

        let tracks = query_as::<_, Track>(
            r#"
            SELECT * FROM tracks
            WHERE artist_id = ?
            ORDER BY title COLLATE NOCASE ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(artist_id)
        .bind(page_request.limit())
        .bind(page_request.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(tracks, total as u64, page_request))
    }

    async fn query_by_genre(
        &self,
        genre_id: &str,
        page_request: PageRequest,
    ) -> Result<Page<Track>> {
        let (total,): (i64,) = query_as("SELECT COUNT(*) FROM track_genres WHERE genre_id = ?")
            .bind(genre_id)
            .fetch_one(&self.pool)
            .await?;

        let tracks = query_as::<_, Track>(
            r#"
            SELECT t.* FROM tracks t
            INNER JOIN track_genres tg ON tg.track_id = t.id
            WHERE tg.genre_id = ?
            ORDER BY t.title COLLATE NOCASE ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(genre_id)
        .bind(page_request.limit())
        .bind(page_request.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(tracks, total as u64, page_request))
    }

    async fn count(&self, source_id: &str) -> Result<i64> {
        let (count,): (i64,) = query_as("SELECT COUNT(*) FROM tracks WHERE source_id = ?")
            .bind(source_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

pub(crate) async fn list_for_source(
    conn: &mut SqliteConnection,
    source_id: &str,
) -> Result<Vec<Track>> {
    let tracks = query_as::<_, Track>("SELECT * FROM tracks WHERE source_id = ? ORDER BY id ASC")
        .bind(source_id)
        .fetch_all(conn)
        .await?;

    Ok(tracks)
}

pub(crate) async fn find_by_remote_ids(
    conn: &mut SqliteConnection,
    source_id: &str,
    remote_ids: &[String],
) -> Result<Vec<Track>> {
    super::fetch_by_remote_ids(conn, "tracks", source_id, remote_ids).await
}

/// Insert or overwrite a track keyed by its local id.
pub(crate) async fn upsert(conn: &mut SqliteConnection, track: &Track) -> Result<()> {
    track
        .validate()
        .map_err(|e| LibraryError::invalid("Track", e))?;

    query(
        r#"
        INSERT INTO tracks (
            id, source_id, remote_id, title, normalized_title, duration_secs,
            track_number, disc_number, date_added, play_count, is_liked, container,
            album_id, artist_id, raw_genres, normalized_genres, umbrella_genres,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            remote_id = excluded.remote_id,
            title = excluded.title,
            normalized_title = excluded.normalized_title,
            duration_secs = excluded.duration_secs,
            track_number = excluded.track_number,
            disc_number = excluded.disc_number,
            date_added = excluded.date_added,
            play_count = excluded.play_count,
            is_liked = excluded.is_liked,
            container = excluded.container,
            album_id = excluded.album_id,
            artist_id = excluded.artist_id,
            raw_genres = excluded.raw_genres,
            normalized_genres = excluded.normalized_genres,
            umbrella_genres = excluded.umbrella_genres,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&track.id)
    .bind(&track.source_id)
    .bind(&track.remote_id)
    .bind(&track.title)
    .bind(&track.normalized_title)
    .bind(track.duration_secs)
    .bind(track.track_number)
    .bind(track.disc_number)
    .bind(track.date_added)
    .bind(track.play_count)
    .bind(track.is_liked)
    .bind(&track.container)
    .bind(&track.album_id)
    .bind(&track.artist_id)
    .bind(Json(&track.raw_genres))
    .bind(Json(&track.normalized_genres))
    .bind(Json(&track.umbrella_genres))
    .bind(track.created_at)
    .bind(track.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Replace the genre associations of a track.
pub(crate) async fn replace_genres(
    conn: &mut SqliteConnection,
    track_id: &str,
    genre_ids: &[String],
) -> Result<()> {
    query("DELETE FROM track_genres WHERE track_id = ?")
        .bind(track_id)
        .execute(&mut *conn)
        .await?;

    for genre_id in genre_ids {
        query("INSERT OR IGNORE INTO track_genres (track_id, genre_id) VALUES (?, ?)")
            .bind(track_id)
            .bind(genre_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

pub(crate) async fn delete_many(conn: &mut SqliteConnection, ids: &[String]) -> Result<u64> {
    super::delete_by_ids(conn, "tracks", ids).await
}
