use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An account known to the token cache, derived from the id_token the
/// identity provider returned. One web session holds the tokens of one
/// signed-in user, so the first account in a cache is "the" user.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Stable cache key for this account: "{local_account_id}.{tenant_id}".
    pub home_account_id: String,
    /// Object id (or subject) of the user in the directory.
    pub local_account_id: String,
    /// Sign-in name. B2C puts verified addresses in an `emails` claim.
    pub username: String,
    /// Display name, when the user flow emits one.
    pub name: Option<String>,
    /// Directory (tenant) id the account lives in.
    pub realm: String,
}

impl Account {
    /// Build an account from decoded id_token claims.
    ///
    /// `oid`/`sub` and `tid` identify the account; the username falls back
    /// through `preferred_username`, the B2C `emails` array, and `sub`.
    pub fn from_id_token_claims(claims: &Map<String, Value>) -> Result<Self, String> {
        let local_account_id = claims
            .get("oid")
            .or_else(|| claims.get("sub"))
            .and_then(Value::as_str)
            .ok_or_else(|| "id_token has neither 'oid' nor 'sub' claim".to_string())?
            .to_string();

        let realm = claims
            .get("tid")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let username = claims
            .get("preferred_username")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| {
                claims
                    .get("emails")
                    .and_then(Value::as_array)
                    .and_then(|emails| emails.first())
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| local_account_id.clone());

        let name = claims
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Account {
            home_account_id: format!("{}.{}", local_account_id, realm),
            local_account_id,
            username,
            name,
            realm,
        })
    }
}
