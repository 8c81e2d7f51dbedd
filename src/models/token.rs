use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Account;

/// Wire shape of a successful B2C token-endpoint response.
///
/// `access_token` is optional: a profile-edit flow with no resource scopes
/// returns only an id_token.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    pub scope: Option<String>,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
}

/// Outcome of a token acquisition handed back to callers.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TokenResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub token_type: String,
    /// Unix timestamp the access token expires at.
    pub expires_on: i64,
    pub scopes: Vec<String>,
    pub account: Account,
    /// Present on interactive acquisitions, where a fresh id_token was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token_claims: Option<Map<String, Value>>,
}

/// Query parameters the identity provider sends to the redirect URI.
/// Either `code` + `state` on success, or `error`/`error_description`.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}
