use std::sync::Arc;

use tracing::debug;

use crate::cache::TokenCache;
use crate::client::{Authority, ConfidentialClient};
use crate::config::Config;
use crate::models::{AuthCodeFlow, TokenResult};
use crate::session::SessionStore;

/// Session key holding the serialized token cache blob.
pub const TOKEN_CACHE_KEY: &str = "token_cache";

/// Mediates between per-user web sessions and the identity provider.
///
/// One broker serves all sessions: it loads a session's token cache,
/// hands it to a confidential client for the actual protocol work, and
/// writes the cache back before the operation completes. A cache is never
/// left stale once a token operation has mutated it.
pub struct SessionTokenBroker {
    config: Arc<Config>,
    store: Arc<dyn SessionStore>,
}

impl SessionTokenBroker {
    pub fn new(config: Arc<Config>, store: Arc<dyn SessionStore>) -> Self {
        SessionTokenBroker { config, store }
    }

    /// Deserialize the session's stored cache blob. A session without one
    /// is a new user and gets an empty cache, not an error.
    pub async fn load_cache(&self, session_id: &str) -> Result<TokenCache, String> {
        match self.store.get(session_id, TOKEN_CACHE_KEY).await? {
            Some(blob) => TokenCache::from_blob(&blob),
            None => Ok(TokenCache::new()),
        }
    }

    /// Serialize and overwrite the session's cache blob, but only when the
    /// cache reports unsaved mutations. Saving an unchanged cache is a no-op.
    pub async fn save_cache(
        &self,
        session_id: &str,
        cache: &mut TokenCache,
    ) -> Result<(), String> {
        if !cache.has_state_changed() {
            return Ok(());
        }
        let blob = cache.to_blob()?;
        self.store.set(session_id, TOKEN_CACHE_KEY, &blob).await?;
        cache.mark_saved();
        debug!("Persisted token cache for session '{}'", session_id);
        Ok(())
    }

    /// A confidential client bound to the configured client id/secret and
    /// the given authority; defaults to the sign-up/sign-in authority.
    /// Passing a cache enables silent-refresh lookups.
    pub fn build_identity_client(
        &self,
        cache: Option<TokenCache>,
        authority: Option<Authority>,
    ) -> ConfidentialClient {
        ConfidentialClient::new(
            &self.config.client_id,
            &self.config.client_secret,
            authority.unwrap_or_else(|| self.config.authority()),
            cache,
        )
    }

    /// Start an authorization-code flow for the given scopes, redirecting
    /// back to `{url_base}/authorize`. The returned flow state is the
    /// caller's to persist (in the session) and to validate the provider's
    /// callback against.
    pub fn build_auth_code_flow(
        &self,
        authority: Option<Authority>,
        scopes: &[String],
    ) -> Result<AuthCodeFlow, String> {
        self.build_identity_client(None, authority)
            .initiate_auth_code_flow(scopes, &self.config.redirect_uri())
    }

    /// Silent acquisition for the session's signed-in user: load the cache,
    /// take its first account, and acquire without interaction. The cache is
    /// persisted afterward (a refresh mutates it); a session with no cached
    /// account yields `None` and the trailing save is a no-op.
    pub async fn get_token_from_cache(
        &self,
        session_id: &str,
        scopes: &[String],
    ) -> Result<Option<TokenResult>, String> {
        let cache = self.load_cache(session_id).await?;
        let mut client = self.build_identity_client(Some(cache), None);

        let accounts = client.get_accounts();
        let result = match accounts.first() {
            Some(account) => client.acquire_token_silent(scopes, account).await?,
            None => {
                debug!(
                    "No account cached for session '{}'; silent acquisition not possible",
                    session_id
                );
                None
            }
        };

        let mut cache = client.into_cache();
        self.save_cache(session_id, &mut cache).await?;
        Ok(result)
    }
}
