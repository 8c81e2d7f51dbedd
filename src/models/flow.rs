use serde::{Deserialize, Serialize};

/// State of an in-flight authorization-code flow.
///
/// Created when we send the user to the identity provider and stashed in the
/// session; the provider's redirect back to us must match it (`state`), and
/// the token exchange needs `code_verifier` and `redirect_uri` again.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthCodeFlow {
    /// CSRF token echoed back by the provider in the callback.
    pub state: String,
    /// Nonce bound into the id_token.
    pub nonce: String,
    /// PKCE verifier matching the challenge sent in the authorize request.
    pub code_verifier: String,
    /// Redirect URI used for this flow; must be repeated in the exchange.
    pub redirect_uri: String,
    /// Scopes the caller asked for (identity scopes are added on the wire).
    pub scopes: Vec<String>,
    /// Authority the flow was started against, so the callback exchanges
    /// the code at the same user flow's token endpoint.
    pub authority: String,
    /// Fully composed authorize URL to send the user to.
    pub auth_uri: String,
}
