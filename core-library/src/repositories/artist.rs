//! Artist repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{normalize_name, Artist};
use crate::repositories::{Page, PageRequest};
use async_trait::async_trait;
use sqlx::{query, query_as, SqliteConnection, SqlitePool};

/// Artist repository interface for data access operations
#[async_trait]
pub trait ArtistRepository: Send + Sync {
    /// Find an artist by its ID
    ///
    /// # Returns
    /// - `Ok(Some(artist))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn find_by_id(&self, id: &str) -> Result<Option<Artist>>;

    /// Find an artist by the server's identifier
    async fn find_by_remote_id(&self, source_id: &str, remote_id: &str)
        -> Result<Option<Artist>>;

    /// Find an artist by name
    ///
    /// An exact match wins over a case-insensitive one.
    async fn find_by_name(&self, source_id: &str, name: &str) -> Result<Option<Artist>>;

    /// Query a source's artists ordered by name
    ///
    /// # Arguments
    /// * `source_id` - Owning source
    /// * `page_request` - Pagination parameters
    async fn query(&self, source_id: &str, page_request: PageRequest) -> Result<Page<Artist>>;

    /// Artists still waiting for a full sync to resolve their remote id
    async fn placeholders(&self, source_id: &str) -> Result<Vec<Artist>>;

    /// Count a source's artists
    async fn count(&self, source_id: &str) -> Result<i64>;
}

/// SQLite implementation of ArtistRepository
pub struct SqliteArtistRepository {
    pool: SqlitePool,
}

impl SqliteArtistRepository {
    /// Create a new SqliteArtistRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArtistRepository for SqliteArtistRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Artist>> {
        let artist = query_as::<_, Artist>("SELECT * FROM artists WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(artist)
    }

    async fn find_by_remote_id(
        &self,
        source_id: &str,
        remote_id: &str,
    ) -> Result<Option<Artist>> {
        let artist =
            query_as::<_, Artist>("SELECT * FROM artists WHERE source_id = ? AND remote_id = ?")
                .bind(source_id)
                .bind(remote_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(artist)
    }

    async fn find_by_name(&self, source_id: &str, name: &str) -> Result<Option<Artist>> {
        let artist = query_as::<_, Artist>(
            r#"
            SELECT * FROM artists
            WHERE source_id = ? AND normalized_name = ?
            ORDER BY (name = ?) DESC, remote_id IS NULL ASC, created_at ASC
            LIMIT 1
            "#,
        )
        .bind(source_id)
        .bind(normalize_name(name))
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(artist)
    }

    async fn query(&self, source_id: &str, page_request: PageRequest) -> Result<Page<Artist>> {
        let total = self.count(source_id).await?;

        let artists = query_as::<_, Artist>(
            r#"
            SELECT * FROM artists
            WHERE source_id = ?
            ORDER BY COALESCE(sort_name, name) COLLATE NOCASE ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(source_id)
        .bind(page_request.limit())
        .bind(page_request.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(artists, total as u64, page_request))
    }

    async fn placeholders(&self, source_id: &str) -> Result<Vec<Artist>> {
        let artists = query_as::<_, Artist>(
            "SELECT * FROM artists WHERE source_id = ? AND remote_id IS NULL ORDER BY name ASC",
        )
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(artists)
    }

    async fn count(&self, source_id: &str) -> Result<i64> {
        let (count,): (i64,) = query_as("SELECT COUNT(*) FROM artists WHERE source_id = ?")
            .bind(source_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

pub(crate) async fn list_for_source(
    conn: &mut SqliteConnection,
    source_id: &str,
) -> Result<Vec<Artist>> {
    let artists = query_as::<_, Artist>(
        "SELECT * FROM artists WHERE source_id = ? ORDER BY created_at ASC, id ASC",
    )
    .bind(source_id)
    .fetch_all(conn)
    .await?;

    Ok(artists)
}

/// Insert or overwrite an artist keyed by its local id.
pub(crate) async fn upsert(conn: &mut SqliteConnection, artist: &Artist) -> Result<()> {
    artist
        .validate()
        .map_err(|e| LibraryError::invalid("Artist", e))?;

    query(
        r#"
        INSERT INTO artists (
            id, source_id, remote_id, name, normalized_name, sort_name, image_tag,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            remote_id = excluded.remote_id,
            name = excluded.name,
            normalized_name = excluded.normalized_name,
            sort_name = excluded.sort_name,
            image_tag = excluded.image_tag,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&artist.id)
    .bind(&artist.source_id)
    .bind(&artist.remote_id)
    .bind(&artist.name)
    .bind(&artist.normalized_name)
    .bind(&artist.sort_name)
    .bind(&artist.image_tag)
    .bind(artist.created_at)
    .bind(artist.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) async fn delete_many(conn: &mut SqliteConnection, ids: &[String]) -> Result<u64> {
    super::delete_by_ids(conn, "artists", ids).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, insert_test_source};
    use bridge_traits::ServerKind;

    async fn setup() -> (SqlitePool, String) {
        let pool = create_test_pool().await.unwrap();
        let source = insert_test_source(&pool, ServerKind::Jellyfin).await.unwrap();
        (pool, source.id)
    }

    async fn store(pool: &SqlitePool, artist: &Artist) {
        let mut conn = pool.acquire().await.unwrap();
        upsert(&mut conn, artist).await.unwrap();
    }

    #[tokio::test]
    async fn test_upsert_and_find_artist() {
        let (pool, source_id) = setup().await;
        let repo = SqliteArtistRepository::new(pool.clone());

        let artist = Artist::new(&source_id, "ar-1", "Pink Floyd", 10);
        store(&pool, &artist).await;

        let found = repo.find_by_id(&artist.id).await.unwrap().unwrap();
        assert_eq!(found, artist);

        let by_remote = repo
            .find_by_remote_id(&source_id, "ar-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_remote.id, artist.id);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_in_place() {
        let (pool, source_id) = setup().await;
        let repo = SqliteArtistRepository::new(pool.clone());

        let mut artist = Artist::new(&source_id, "ar-1", "Pink Floyd", 10);
        store(&pool, &artist).await;

        artist.sort_name = Some("Floyd, Pink".to_string());
        artist.updated_at = 20;
        store(&pool, &artist).await;

        let found = repo.find_by_id(&artist.id).await.unwrap().unwrap();
        assert_eq!(found.sort_name.as_deref(), Some("Floyd, Pink"));
        assert_eq!(found.created_at, 10);
        assert_eq!(found.updated_at, 20);
        assert_eq!(repo.count(&source_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_by_name_prefers_exact_match() {
        let (pool, source_id) = setup().await;
        let repo = SqliteArtistRepository::new(pool.clone());

        let lower = Artist::new(&source_id, "ar-1", "pink floyd", 10);
        let exact = Artist::new(&source_id, "ar-2", "Pink Floyd", 20);
        store(&pool, &lower).await;
        store(&pool, &exact).await;

        let found = repo.find_by_name(&source_id, "Pink Floyd").await.unwrap().unwrap();
        assert_eq!(found.id, exact.id);

        let found = repo.find_by_name(&source_id, "PINK FLOYD").await.unwrap().unwrap();
        assert_eq!(found.id, lower.id);

        assert!(repo.find_by_name(&source_id, "Yes").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_placeholders_and_delete_many() {
        let (pool, source_id) = setup().await;
        let repo = SqliteArtistRepository::new(pool.clone());

        let real = Artist::new(&source_id, "ar-1", "Björk", 10);
        let placeholder = Artist::placeholder(&source_id, "Moloko", 10);
        let other = Artist::placeholder(&source_id, "Air", 10);
        store(&pool, &real).await;
        store(&pool, &placeholder).await;
        store(&pool, &other).await;

        let names: Vec<String> = repo
            .placeholders(&source_id)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Air", "Moloko"]);

        let mut conn = pool.acquire().await.unwrap();
        let deleted = delete_many(&mut conn, &[placeholder.id.clone(), other.id.clone()])
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert!(delete_many(&mut conn, &[]).await.unwrap() == 0);
        drop(conn);

        assert_eq!(repo.count(&source_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_query_with_pagination() {
        let (pool, source_id) = setup().await;
        let repo = SqliteArtistRepository::new(pool.clone());

        for (i, name) in ["Cure", "air", "Beck"].iter().enumerate() {
            store(&pool, &Artist::new(&source_id, &format!("ar-{}", i), name, 10)).await;
        }

        let page = repo.query(&source_id, PageRequest::new(0, 2)).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        let names: Vec<&str> = page.items.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["air", "Beck"]);
    }

    #[tokio::test]
    async fn test_upsert_rejects_empty_name() {
        let (pool, source_id) = setup().await;
        let artist = Artist::new(&source_id, "ar-1", "   ", 10);

        let mut conn = pool.acquire().await.unwrap();
        let result = upsert(&mut conn, &artist).await;
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
    }
}
