use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::SessionStore;

/// An in-process session store for single-instance deployments and tests.
/// Sessions live until cleared or until the process exits.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>, String> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn set(&self, session_id: &str, key: &str, value: &str) -> Result<(), String> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, session_id: &str, key: &str) -> Result<(), String> {
        let mut sessions = self.sessions.write().await;
        if let Some(entries) = sessions.get_mut(session_id) {
            entries.remove(key);
        }
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<(), String> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Set/get round trip within one session.
    #[tokio::test]
    async fn test_set_then_get() {
        let store = MemorySessionStore::new();
        store.set("sid-1", "token_cache", "{}").await.unwrap();
        let value = store.get("sid-1", "token_cache").await.unwrap();
        assert_eq!(value.as_deref(), Some("{}"));
    }

    /// A missing entry is None, not an error.
    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemorySessionStore::new();
        let value = store.get("sid-1", "token_cache").await.unwrap();
        assert!(value.is_none());
    }

    /// Entries are private to their session.
    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = MemorySessionStore::new();
        store.set("sid-1", "token_cache", "a").await.unwrap();
        let other = store.get("sid-2", "token_cache").await.unwrap();
        assert!(other.is_none());
    }

    /// Clearing a session drops all of its entries.
    #[tokio::test]
    async fn test_clear_drops_all_entries() {
        let store = MemorySessionStore::new();
        store.set("sid-1", "token_cache", "a").await.unwrap();
        store.set("sid-1", "user", "b").await.unwrap();
        store.clear("sid-1").await.unwrap();
        assert!(store.get("sid-1", "token_cache").await.unwrap().is_none());
        assert!(store.get("sid-1", "user").await.unwrap().is_none());
    }
}
