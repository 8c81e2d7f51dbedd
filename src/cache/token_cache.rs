use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Account, TokenResponse, TokenResult};

/// Cached access tokens are treated as expired this many seconds early,
/// so a token handed to a caller survives the request it is used for.
const EXPIRY_LEEWAY_SECS: i64 = 300;

/// An access token held in the cache, scoped to one account.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CachedAccessToken {
    pub home_account_id: String,
    pub scopes: Vec<String>,
    pub secret: String,
    pub token_type: String,
    /// Unix timestamp the token expires at.
    pub expires_on: i64,
}

/// A serializable token cache, one per web session.
///
/// The cache round-trips through the session store as an opaque JSON blob.
/// `state_changed` is deliberately not serialized: it tracks whether this
/// in-memory copy has diverged from the stored blob, so the broker can skip
/// session writes when nothing happened.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TokenCache {
    pub version: i32,
    accounts: Vec<Account>,
    /// home_account_id -> refresh token.
    refresh_tokens: HashMap<String, String>,
    access_tokens: Vec<CachedAccessToken>,
    #[serde(skip)]
    state_changed: bool,
}

impl Default for TokenCache {
    fn default() -> Self {
        TokenCache {
            version: 1,
            accounts: Vec::new(),
            refresh_tokens: HashMap::new(),
            access_tokens: Vec::new(),
            state_changed: false,
        }
    }
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserialize a cache from its session blob.
    pub fn from_blob(blob: &str) -> Result<Self, String> {
        serde_json::from_str(blob).map_err(|e| format!("Failed to deserialize token cache: {}", e))
    }

    /// Serialize the cache to the opaque blob kept in the session.
    pub fn to_blob(&self) -> Result<String, String> {
        serde_json::to_string(self).map_err(|e| format!("Failed to serialize token cache: {}", e))
    }

    /// Whether this copy has mutations the session store has not seen yet.
    pub fn has_state_changed(&self) -> bool {
        self.state_changed
    }

    /// Called by the broker once the blob has been written back.
    pub fn mark_saved(&mut self) {
        self.state_changed = false;
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Register an account, replacing any previous record with the same
    /// home_account_id.
    pub fn upsert_account(&mut self, account: Account) {
        self.accounts
            .retain(|a| a.home_account_id != account.home_account_id);
        self.accounts.push(account);
        self.state_changed = true;
    }

    pub fn refresh_token(&self, home_account_id: &str) -> Option<&str> {
        self.refresh_tokens.get(home_account_id).map(String::as_str)
    }

    /// An unexpired access token for the account covering all requested
    /// scopes, if the cache holds one.
    pub fn find_access_token(
        &self,
        home_account_id: &str,
        scopes: &[String],
        now: i64,
    ) -> Option<&CachedAccessToken> {
        self.access_tokens.iter().find(|t| {
            t.home_account_id == home_account_id
                && t.expires_on - EXPIRY_LEEWAY_SECS > now
                && scopes.iter().all(|s| t.scopes.contains(s))
        })
    }

    /// Fold a token-endpoint response into the cache and produce the result
    /// handed back to the caller. Rotated refresh tokens replace the stored
    /// one; the new access token replaces any cached token for the same
    /// account and scope set.
    pub fn store_token_response(
        &mut self,
        account: &Account,
        response: &TokenResponse,
        requested_scopes: &[String],
    ) -> TokenResult {
        let now = Utc::now().timestamp();
        let scopes: Vec<String> = response
            .scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .filter(|parsed: &Vec<String>| !parsed.is_empty())
            .unwrap_or_else(|| requested_scopes.to_vec());
        let token_type = response
            .token_type
            .clone()
            .unwrap_or_else(|| "Bearer".to_string());
        let expires_on = now + response.expires_in.unwrap_or(3600);

        if let Some(secret) = &response.access_token {
            self.access_tokens.retain(|t| {
                !(t.home_account_id == account.home_account_id && t.scopes == scopes)
            });
            self.access_tokens.push(CachedAccessToken {
                home_account_id: account.home_account_id.clone(),
                scopes: scopes.clone(),
                secret: secret.clone(),
                token_type: token_type.clone(),
                expires_on,
            });
        }

        if let Some(refresh_token) = &response.refresh_token {
            debug!(
                "Storing refresh token for account '{}'",
                account.home_account_id
            );
            self.refresh_tokens
                .insert(account.home_account_id.clone(), refresh_token.clone());
        }

        self.state_changed = true;

        TokenResult {
            access_token: response.access_token.clone(),
            token_type,
            expires_on,
            scopes,
            account: account.clone(),
            id_token_claims: None,
        }
    }
}
