mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokenbroker::broker::SessionTokenBroker;
use tokenbroker::cache::TokenCache;
use tokenbroker::models::{Account, TokenResponse};
use tokenbroker::session::memory_store::MemorySessionStore;
use tokenbroker::session::SessionStore;

/// Wraps the memory store and counts every write, so tests can assert the
/// broker's write-avoidance behavior.
struct CountingStore {
    inner: MemorySessionStore,
    writes: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        CountingStore {
            inner: MemorySessionStore::new(),
            writes: AtomicUsize::new(0),
        }
    }

    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStore for CountingStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>, String> {
        self.inner.get(session_id, key).await
    }

    async fn set(&self, session_id: &str, key: &str, value: &str) -> Result<(), String> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(session_id, key, value).await
    }

    async fn remove(&self, session_id: &str, key: &str) -> Result<(), String> {
        self.inner.remove(session_id, key).await
    }

    async fn clear(&self, session_id: &str) -> Result<(), String> {
        self.inner.clear(session_id).await
    }
}

fn test_account() -> Account {
    Account {
        home_account_id: "oid-1.tid-1".to_string(),
        local_account_id: "oid-1".to_string(),
        username: "player@example.com".to_string(),
        name: Some("Player One".to_string()),
        realm: "tid-1".to_string(),
    }
}

fn token_response(access_token: Option<&str>, refresh_token: Option<&str>) -> TokenResponse {
    TokenResponse {
        access_token: access_token.map(str::to_string),
        token_type: Some("Bearer".to_string()),
        expires_in: Some(3600),
        scope: Some("demo.read".to_string()),
        refresh_token: refresh_token.map(str::to_string),
        id_token: None,
    }
}

fn broker_with(store: Arc<dyn SessionStore>) -> SessionTokenBroker {
    SessionTokenBroker::new(Arc::new(common::load_test_config()), store)
}

/// A mutated cache is written exactly once; a second save with no
/// intervening mutation does not touch the store again.
#[tokio::test]
async fn test_save_cache_writes_only_on_state_change() {
    let store = Arc::new(CountingStore::new());
    let broker = broker_with(store.clone());

    let mut cache = TokenCache::new();
    cache.upsert_account(test_account());

    broker.save_cache("sid-1", &mut cache).await.unwrap();
    assert_eq!(store.writes(), 1);

    broker.save_cache("sid-1", &mut cache).await.unwrap();
    assert_eq!(store.writes(), 1, "unchanged cache must not be re-written");
}

/// A brand-new cache has nothing to say; saving it is a no-op.
#[tokio::test]
async fn test_save_cache_skips_pristine_cache() {
    let store = Arc::new(CountingStore::new());
    let broker = broker_with(store.clone());

    let mut cache = TokenCache::new();
    broker.save_cache("sid-1", &mut cache).await.unwrap();
    assert_eq!(store.writes(), 0);
}

/// Silent acquisition on an empty session: no result, and the trailing
/// cache save is a no-op.
#[tokio::test]
async fn test_get_token_from_cache_empty_session() {
    let store = Arc::new(CountingStore::new());
    let broker = broker_with(store.clone());

    let result = broker
        .get_token_from_cache("sid-1", &["demo.read".to_string()])
        .await
        .expect("empty session is not an error");

    assert!(result.is_none());
    assert_eq!(store.writes(), 0);
}

/// An unexpired cached access token is served straight from the session
/// cache, with no token-endpoint traffic.
#[tokio::test]
async fn test_get_token_from_cache_serves_cached_token() {
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let broker = broker_with(store.clone());

    let account = test_account();
    let mut cache = TokenCache::new();
    cache.upsert_account(account.clone());
    cache.store_token_response(&account, &token_response(Some("at-1"), Some("rt-1")), &[]);
    broker.save_cache("sid-1", &mut cache).await.unwrap();

    let result = broker
        .get_token_from_cache("sid-1", &["demo.read".to_string()])
        .await
        .unwrap()
        .expect("cached token should be returned");

    assert_eq!(result.access_token.as_deref(), Some("at-1"));
    assert_eq!(result.account, account);
}

/// The cache round-trips through the session store between operations.
#[tokio::test]
async fn test_cache_round_trips_through_store() {
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let broker = broker_with(store.clone());

    let account = test_account();
    let mut cache = TokenCache::new();
    cache.upsert_account(account.clone());
    cache.store_token_response(&account, &token_response(None, Some("rt-1")), &[]);
    broker.save_cache("sid-1", &mut cache).await.unwrap();

    let reloaded = broker.load_cache("sid-1").await.unwrap();
    assert_eq!(reloaded.accounts(), &[account.clone()]);
    assert_eq!(reloaded.refresh_token(&account.home_account_id), Some("rt-1"));
    assert!(!reloaded.has_state_changed());

    // Another session sees none of it.
    let other = broker.load_cache("sid-2").await.unwrap();
    assert!(other.accounts().is_empty());
}
