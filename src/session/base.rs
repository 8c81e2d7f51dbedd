use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use super::memory_store::MemorySessionStore;
use super::mongodb_store::MongoDBSessionStore;
use crate::config::SessionStoreConfig;

/// The SessionStore trait abstracts the server-side web session: string
/// blobs keyed by (session id, entry key). The token cache lives here as
/// one opaque entry; each session's entries are private to that session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>, String>;
    async fn set(&self, session_id: &str, key: &str, value: &str) -> Result<(), String>;
    async fn remove(&self, session_id: &str, key: &str) -> Result<(), String>;
    /// Drop the whole session (logout).
    async fn clear(&self, session_id: &str) -> Result<(), String>;
}

/// Creates a concrete session store based on the SessionStoreConfig.
/// A broken MongoDB backend is fatal at startup, never at request time.
pub async fn create_session_store(config: &SessionStoreConfig) -> Arc<dyn SessionStore> {
    match config {
        SessionStoreConfig::Memory => {
            info!("Using in-memory session store.");
            Arc::new(MemorySessionStore::new())
        }
        SessionStoreConfig::MongoDB(mongo_config) => {
            match MongoDBSessionStore::new(mongo_config).await {
                Ok(store) => {
                    info!("Successfully created MongoDB session store.");
                    Arc::new(store)
                }
                Err(e) => {
                    error!("Failed to create MongoDB session store: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
