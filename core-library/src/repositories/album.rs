//! Album repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::Album;
use crate::repositories::{Page, PageRequest};
use async_trait::async_trait;
use sqlx::{query, query_as, SqliteConnection, SqlitePool};

/// Album repository interface for data access operations
#[async_trait]
pub trait AlbumRepository: Send + Sync {
    /// Find an album by its ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Album>>;

    /// Find an album by the server's identifier
    async fn find_by_remote_id(&self, source_id: &str, remote_id: &str) -> Result<Option<Album>>;

    /// Albums of a source whose remote ids are in `remote_ids`
    async fn find_by_remote_ids(
        &self,
        source_id: &str,
        remote_ids: &[String],
    ) -> Result<Vec<Album>>;

    /// Query a source's albums ordered by title
    async fn query(&self, source_id: &str, page_request: PageRequest) -> Result<Page<Album>>;

    /// Query albums linked to an artist, newest first
    ///
    /// # Arguments
    /// * `artist_id` - Local artist identifier
    /// * `page_request` - Pagination parameters
    async fn query_by_artist(
        &self,
        artist_id: &str,
        page_request: PageRequest,
    ) -> Result<Page<Album>>;

    /// Count a source's albums
    async fn count(&self, source_id: &str) -> Result<i64>;
}

/// SQLite implementation of AlbumRepository
pub struct SqliteAlbumRepository {
    pool: SqlitePool,
}

impl SqliteAlbumRepository {
    /// Create a new SqliteAlbumRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlbumRepository for SqliteAlbumRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Album>> {
        let album = query_as::<_, Album>("SELECT * FROM albums WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(album)
    }

    async fn find_by_remote_id(&self, source_id: &str, remote_id: &str) -> Result<Option<Album>> {
        let album =
            query_as::<_, Album>("SELECT * FROM albums WHERE source_id = ? AND remote_id = ?")
                .bind(source_id)
                .bind(remote_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(album)
    }

    async fn find_by_remote_ids(
        &self,
        source_id: &str,
        remote_ids: &[String],
    ) -> Result<Vec<Album>> {
        let mut conn = self.pool.acquire().await?;
        find_by_remote_ids(&mut conn, source_id, remote_ids).await
    }

    async fn query(&self, source_id: &str, page_request: PageRequest) -> Result<Page<Album>> {
        let total = self.count(source_id).await?;

        let albums = query_as::<_, Album>(
            r#"
            SELECT * FROM albums
            WHERE source_id = ?
            ORDER BY COALESCE(sort_title, title) COLLATE NOCASE ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(source_id)
        .bind(page_request.limit())
        .bind(page_request.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(albums, total as u64, page_request))
    }

    async fn query_by_artist(
        &self,
        artist_id: &str,
        page_request: PageRequest,
    ) -> Result<Page<Album>> {
        let (total,): (i64,) = query_as("SELECT COUNT(*) FROM albums WHERE artist_id = ?")
            .bind(artist_id)
            .fetch_one(&self.pool)
            .await?;

        let albums = query_as::<_, Album>(
            r#"
            SELECT * FROM albums
            WHERE artist_id = ?
            ORDER BY production_year DESC, title ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(artist_id)
        .bind(page_request.limit())
        .bind(page_request.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(albums, total as u64, page_request))
    }

    async fn count(&self, source_id: &str) -> Result<i64> {
        let (count,): (i64,) = query_as("SELECT COUNT(*) FROM albums WHERE source_id = ?")
            .bind(source_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

pub(crate) async fn list_for_source(
    conn: &mut SqliteConnection,
    source_id: &str,
) -> Result<Vec<Album>> {
    let albums = query_as::<_, Album>("SELECT * FROM albums WHERE source_id = ? ORDER BY id ASC")
        .bind(source_id)
        .fetch_all(conn)
        .await?;

    Ok(albums)
}

pub(crate) async fn find_by_remote_ids(
    conn: &mut SqliteConnection,
    source_id: &str,
    remote_ids: &[String],
) -> Result<Vec<Album>> {
    super::fetch_by_remote_ids(conn, "albums", source_id, remote_ids).await
}

/// Insert or overwrite an album keyed by its local id.
pub(crate) async fn upsert(conn: &mut SqliteConnection, album: &Album) -> Result<()> {
    album
        .validate()
        .map_err(|e| LibraryError::invalid("Album", e))?;

    query(
        r#"
        INSERT INTO albums (
            id, source_id, remote_id, title, normalized_title, sort_title,
            production_year, image_tag, artist_id, artist_name, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            remote_id = excluded.remote_id,
            title = excluded.title,
            normalized_title = excluded.normalized_title,
            sort_title = excluded.sort_title,
            production_year = excluded.production_year,
            image_tag = excluded.image_tag,
            artist_id = excluded.artist_id,
            artist_name = excluded.artist_name,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&album.id)
    .bind(&album.source_id)
    .bind(&album.remote_id)
    .bind(&album.title)
    .bind(&album.normalized_title)
    .bind(&album.sort_title)
    .bind(album.production_year)
    .bind(&album.image_tag)
    .bind(&album.artist_id)
    .bind(&album.artist_name)
    .bind(album.created_at)
    .bind(album.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) async fn delete_many(conn: &mut SqliteConnection, ids: &[String]) -> Result<u64> {
    super::delete_by_ids(conn, "albums", ids).await
}
