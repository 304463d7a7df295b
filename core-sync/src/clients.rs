//! Media server clients registered per Source

use crate::{Result, SyncError};
use bridge_traits::MediaServerClient;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Shared map of Source id to its authenticated client
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<RwLock<HashMap<String, Arc<dyn MediaServerClient>>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `client` for `source_id`, replacing any previous one
    pub async fn register(&self, source_id: impl Into<String>, client: Arc<dyn MediaServerClient>) {
        let source_id = source_id.into();
        let mut clients = self.clients.write().await;
        if clients.insert(source_id.clone(), client).is_some() {
            info!(source_id = %source_id, "Replaced media server client");
        } else {
            info!(source_id = %source_id, "Registered media server client");
        }
    }

    pub async fn get(&self, source_id: &str) -> Result<Arc<dyn MediaServerClient>> {
        self.clients
            .read()
            .await
            .get(source_id)
            .cloned()
            .ok_or_else(|| SyncError::ClientNotRegistered {
                source_id: source_id.to_string(),
            })
    }

    /// Forget the client of `source_id`; returns whether one was registered
    pub async fn remove(&self, source_id: &str) -> bool {
        self.clients.write().await.remove(source_id).is_some()
    }

    pub async fn contains(&self, source_id: &str) -> bool {
        self.clients.read().await.contains_key(source_id)
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry").finish_non_exhaustive()
    }
}
