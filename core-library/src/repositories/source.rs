//! Source repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::Source;
use async_trait::async_trait;
use sqlx::{query, query_as, SqliteConnection, SqlitePool};

/// Source repository interface
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Find a source by its ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Source>>;

    /// Insert a new source
    ///
    /// # Errors
    /// Returns error if validation fails or the ID already exists
    async fn insert(&self, source: &Source) -> Result<()>;

    /// Update display name, connection info and user of an existing source
    async fn update(&self, source: &Source) -> Result<()>;

    /// Delete a source and, through cascading foreign keys, its whole cache partition
    async fn delete(&self, id: &str) -> Result<bool>;

    /// All configured sources ordered by display name
    async fn list(&self) -> Result<Vec<Source>>;

    /// The source the UI currently reads from
    async fn find_active(&self) -> Result<Option<Source>>;

    /// Make `id` the only active source
    ///
    /// # Errors
    /// Returns `NotFound` if no source has that ID; the previous active
    /// source is left untouched in that case.
    async fn set_active(&self, id: &str, now: i64) -> Result<()>;
}

/// SQLite implementation of SourceRepository
pub struct SqliteSourceRepository {
    pool: SqlitePool,
}

impl SqliteSourceRepository {
    /// Create a new SqliteSourceRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SourceRepository for SqliteSourceRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Source>> {
        let mut conn = self.pool.acquire().await?;
        find(&mut conn, id).await
    }

    async fn insert(&self, source: &Source) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, source).await
    }

    async fn update(&self, source: &Source) -> Result<()> {
        source
            .validate()
            .map_err(|e| LibraryError::invalid("Source", e))?;

        let result = query(
            r#"
            UPDATE sources
            SET display_name = ?, server_kind = ?, base_url = ?, user_id = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&source.display_name)
        .bind(source.server_kind.as_str())
        .bind(&source.base_url)
        .bind(&source.user_id)
        .bind(source.updated_at)
        .bind(&source.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "Source".to_string(),
                id: source.id.clone(),
            });
        }

        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = query("DELETE FROM sources WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<Source>> {
        let sources = query_as::<_, Source>("SELECT * FROM sources ORDER BY display_name ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(sources)
    }

    async fn find_active(&self) -> Result<Option<Source>> {
        let source = query_as::<_, Source>("SELECT * FROM sources WHERE is_active = 1")
            .fetch_optional(&self.pool)
            .await?;

        Ok(source)
    }

    async fn set_active(&self, id: &str, now: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        query("UPDATE sources SET is_active = 0, updated_at = ? WHERE is_active = 1 AND id != ?")
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = query("UPDATE sources SET is_active = 1, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(LibraryError::NotFound {
                entity_type: "Source".to_string(),
                id: id.to_string(),
            });
        }

        tx.commit().await?;
        Ok(())
    }
}

pub(crate) async fn find(conn: &mut SqliteConnection, id: &str) -> Result<Option<Source>> {
    let source = query_as::<_, Source>("SELECT * FROM sources WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(source)
}

pub(crate) async fn insert(conn: &mut SqliteConnection, source: &Source) -> Result<()> {
    source
        .validate()
        .map_err(|e| LibraryError::invalid("Source", e))?;

    query(
        r#"
        INSERT INTO sources (
            id, display_name, server_kind, base_url, user_id, is_active,
            last_synced_at, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&source.id)
    .bind(&source.display_name)
    .bind(source.server_kind.as_str())
    .bind(&source.base_url)
    .bind(&source.user_id)
    .bind(source.is_active)
    .bind(source.last_synced_at)
    .bind(source.created_at)
    .bind(source.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) async fn mark_synced(conn: &mut SqliteConnection, id: &str, at: i64) -> Result<()> {
    let result = query("UPDATE sources SET last_synced_at = ?, updated_at = ? WHERE id = ?")
        .bind(at)
        .bind(at)
        .bind(id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(LibraryError::NotFound {
            entity_type: "Source".to_string(),
            id: id.to_string(),
        });
    }

    Ok(())
}
