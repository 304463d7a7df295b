//! Genre repository trait and implementation

use crate::error::Result;
use crate::genre::UNKNOWN_KEY;
use crate::models::Genre;
use async_trait::async_trait;
use sqlx::{query, query_as, SqliteConnection, SqlitePool};

/// Genre repository interface
#[async_trait]
pub trait GenreRepository: Send + Sync {
    /// Find a genre by its ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Genre>>;

    /// Find a genre by its normalized key
    async fn find_by_normalized_name(
        &self,
        source_id: &str,
        normalized_name: &str,
    ) -> Result<Option<Genre>>;

    /// All genres of a source ordered by display name
    async fn list(&self, source_id: &str) -> Result<Vec<Genre>>;

    /// Genres grouped under one umbrella category
    async fn list_by_umbrella(&self, source_id: &str, umbrella: &str) -> Result<Vec<Genre>>;

    /// Genres attached to a track
    async fn genres_for_track(&self, track_id: &str) -> Result<Vec<Genre>>;

    /// Count a source's genres
    async fn count(&self, source_id: &str) -> Result<i64>;
}

/// SQLite implementation of GenreRepository
pub struct SqliteGenreRepository {
    pool: SqlitePool,
}

impl SqliteGenreRepository {
    /// Create a new SqliteGenreRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GenreRepository for SqliteGenreRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Genre>> {
        let genre = query_as::<_, Genre>("SELECT * FROM genres WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(genre)
    }

    async fn find_by_normalized_name(
        &self,
        source_id: &str,
        normalized_name: &str,
    ) -> Result<Option<Genre>> {
        let genre = query_as::<_, Genre>(
            "SELECT * FROM genres WHERE source_id = ? AND normalized_name = ?",
        )
        .bind(source_id)
        .bind(normalized_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(genre)
    }

    async fn list(&self, source_id: &str) -> Result<Vec<Genre>> {
        let genres = query_as::<_, Genre>(
            "SELECT * FROM genres WHERE source_id = ? ORDER BY raw_name COLLATE NOCASE ASC",
        )
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(genres)
    }

    async fn list_by_umbrella(&self, source_id: &str, umbrella: &str) -> Result<Vec<Genre>> {
        let genres = query_as::<_, Genre>(
            r#"
            SELECT * FROM genres
            WHERE source_id = ? AND umbrella_name = ?
            ORDER BY raw_name COLLATE NOCASE ASC
            "#,
        )
        .bind(source_id)
        .bind(umbrella)
        .fetch_all(&self.pool)
        .await?;

        Ok(genres)
    }

    async fn genres_for_track(&self, track_id: &str) -> Result<Vec<Genre>> {
        let genres = query_as::<_, Genre>(
            r#"
            SELECT g.* FROM genres g
            INNER JOIN track_genres tg ON tg.genre_id = g.id
            WHERE tg.track_id = ?
            ORDER BY g.raw_name COLLATE NOCASE ASC
            "#,
        )
        .bind(track_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(genres)
    }

    async fn count(&self, source_id: &str) -> Result<i64> {
        let (count,): (i64,) = query_as("SELECT COUNT(*) FROM genres WHERE source_id = ?")
            .bind(source_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

pub(crate) async fn list_for_source(
    conn: &mut SqliteConnection,
    source_id: &str,
) -> Result<Vec<Genre>> {
    let genres = query_as::<_, Genre>("SELECT * FROM genres WHERE source_id = ? ORDER BY id ASC")
        .bind(source_id)
        .fetch_all(conn)
        .await?;

    Ok(genres)
}

/// Insert or overwrite a genre keyed by its local id.
pub(crate) async fn upsert(conn: &mut SqliteConnection, genre: &Genre) -> Result<()> {
    query(
        r#"
        INSERT INTO genres (
            id, source_id, raw_name, normalized_name, umbrella_name, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            raw_name = excluded.raw_name,
            normalized_name = excluded.normalized_name,
            umbrella_name = excluded.umbrella_name,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&genre.id)
    .bind(&genre.source_id)
    .bind(&genre.raw_name)
    .bind(&genre.normalized_name)
    .bind(&genre.umbrella_name)
    .bind(genre.created_at)
    .bind(genre.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Remove genres no track points at, keeping the synthetic Unknown genre.
pub(crate) async fn delete_unreferenced(
    conn: &mut SqliteConnection,
    source_id: &str,
) -> Result<u64> {
    let result = query(
        r#"
        DELETE FROM genres
        WHERE source_id = ?
          AND normalized_name != ?
          AND NOT EXISTS (SELECT 1 FROM track_genres tg WHERE tg.genre_id = genres.id)
        "#,
    )
    .bind(source_id)
    .bind(UNKNOWN_KEY)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}
