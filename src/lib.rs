//! Library core façade and bootstrap helpers.
//!
//! Wires the database pool, event bus and sync services from a single
//! [`CoreConfig`]. Hosts register a [`MediaServerClient`] per Source and then
//! drive syncs through the returned [`LibraryCore`].
//!
//! ```rust,ignore
//! let config = CoreConfig::builder()
//!     .database_path("/var/mobile/library.db")
//!     .offline_cleaner(download_manager)
//!     .build()?;
//! let core = LibraryCore::bootstrap(config).await?;
//!
//! core.add_source(&source, client).await?;
//! core.activate_source(&source.id).await?;
//! let job = core.sync().perform_full_sync(&source.id, None).await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use bridge_traits;
pub use core_library;
pub use core_runtime;
pub use core_sync;

use bridge_traits::MediaServerClient;
use core_library::db::{create_pool, DatabaseConfig};
use core_library::repositories::{SourceRepository, SqliteSourceRepository};
use core_library::Source;
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream, LibraryEvent};
use core_sync::{ClientRegistry, IncrementalMetadataSync, SyncCoordinator};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

/// Running library core for one host process
pub struct LibraryCore {
    config: CoreConfig,
    pool: SqlitePool,
    event_bus: EventBus,
    clients: ClientRegistry,
    coordinator: Arc<SyncCoordinator>,
    incremental: Arc<IncrementalMetadataSync>,
}

impl LibraryCore {
    /// Open the database described by `config` and build the sync services.
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        config.validate()?;
        let pool = create_pool(DatabaseConfig::new(&config.database_path)).await?;
        Ok(Self::with_pool(config, pool))
    }

    /// Build the services on an already migrated pool.
    pub fn with_pool(config: CoreConfig, pool: SqlitePool) -> Self {
        let event_bus = EventBus::new(config.event_buffer_size);
        let clients = ClientRegistry::new();

        let coordinator = Arc::new(SyncCoordinator::new(
            pool.clone(),
            event_bus.clone(),
            &config,
            clients.clone(),
        ));
        let incremental = Arc::new(IncrementalMetadataSync::new(
            pool.clone(),
            Arc::clone(&config.clock),
            event_bus.clone(),
            clients.clone(),
        ));

        info!(database = %config.database_path.display(), "Library core ready");
        Self {
            config,
            pool,
            event_bus,
            clients,
            coordinator,
            incremental,
        }
    }

    /// Persist `source` and register the client used to sync it
    pub async fn add_source(
        &self,
        source: &Source,
        client: Arc<dyn MediaServerClient>,
    ) -> Result<()> {
        SqliteSourceRepository::new(self.pool.clone())
            .insert(source)
            .await?;
        self.clients.register(&source.id, client).await;
        Ok(())
    }

    /// Make `source_id` the Source the UI reads from
    pub async fn activate_source(&self, source_id: &str) -> Result<()> {
        SqliteSourceRepository::new(self.pool.clone())
            .set_active(source_id, self.config.clock.unix_timestamp())
            .await?;
        self.event_bus
            .emit(CoreEvent::Library(LibraryEvent::ActiveSourceChanged {
                source_id: source_id.to_string(),
            }))
            .ok();
        Ok(())
    }

    pub fn sync(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    pub fn incremental(&self) -> &Arc<IncrementalMetadataSync> {
        &self.incremental
    }

    pub fn events(&self) -> &EventBus {
        &self.event_bus
    }

    /// Subscribe to the events of one Source only
    pub fn source_events(&self, source_id: &str) -> EventStream {
        let source_id = source_id.to_string();
        EventStream::new(self.event_bus.subscribe())
            .filter(move |event| event.source_id() == source_id)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }
}
