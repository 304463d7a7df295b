//! # Library Cache Database
//!
//! Opens the SQLite file that backs the library cache and applies the
//! embedded migrations.
//!
//! The UI reads through the pool while a sync writes through one
//! [`LibraryTransaction`](crate::LibraryTransaction), so file-backed pools run
//! in WAL mode with a busy timeout long enough to outlast a sync commit.
//!
//! ```rust,ignore
//! use core_library::db::{create_pool, DatabaseConfig};
//!
//! let pool = create_pool(DatabaseConfig::new("/data/library.db")).await?;
//! let tracks = SqliteTrackRepository::new(pool.clone());
//! let page = tracks.query(&source_id, PageRequest::default()).await?;
//! ```
//!
//! ## Testing
//!
//! Each connection to `sqlite::memory:` opens a separate database, so the test
//! pool has a single connection. Code under test must not read through the
//! pool while it holds a `LibraryTransaction`.

use crate::models::Source;
use crate::repositories::source;
use crate::{LibraryError, Result};
use bridge_traits::ServerKind;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where the cache lives and how many connections may touch it
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `None` opens a private in-memory database
    pub path: Option<std::path::PathBuf>,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// How long a connection waits on a locked database before failing
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            max_connections: 4,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(10),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(1),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = match &self.path {
            Some(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal),
            None => SqliteConnectOptions::new()
                .in_memory(true)
                .journal_mode(SqliteJournalMode::Memory),
        };

        options
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
    }
}

/// Open the pool, apply migrations and verify the connection.
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    let location = config
        .path
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ":memory:".to_string());
    info!(database = %location, max_connections = config.max_connections, "Opening library cache");

    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        // In-memory databases vanish with their last connection
        .idle_timeout(config.path.as_ref().map(|_| Duration::from_secs(600)))
        .max_lifetime(None)
        .connect_with(config.connect_options())
        .await
        .map_err(|e| {
            warn!(database = %location, error = %e, "Failed to open library cache");
            LibraryError::Database(e)
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        warn!(error = %e, "Migration failed");
        LibraryError::Migration(e.to_string())
    })?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;
    debug!(connections = pool.size(), "Library cache ready");

    Ok(pool)
}

/// Migrated single-connection in-memory pool for tests
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    create_pool(DatabaseConfig::in_memory()).await
}

/// Insert a Source to hang catalog rows off (for testing only)
pub async fn insert_test_source(pool: &Pool<Sqlite>, kind: ServerKind) -> Result<Source> {
    let mut source = Source::new(format!("Test {}", kind), kind, "http://media.test:8096", 0);
    source.user_id = Some("test-user".to_string());

    let mut conn = pool.acquire().await?;
    source::insert(&mut conn, &source).await?;
    Ok(source)
}
