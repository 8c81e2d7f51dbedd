use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The base URL an OAuth2/OIDC client directs protocol requests to.
///
/// For Azure AD B2C there is one authority per user flow:
/// `https://{tenant}.b2clogin.com/{tenant}.onmicrosoft.com/{user_flow}`.
/// Tests point this at a mock server via [`Authority::from_url`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct Authority {
    base: String,
}

impl Authority {
    /// Derive the authority for a B2C tenant + user flow.
    pub fn b2c(tenant: &str, user_flow: &str) -> Self {
        Authority {
            base: format!(
                "https://{tenant}.b2clogin.com/{tenant}.onmicrosoft.com/{user_flow}",
                tenant = tenant,
                user_flow = user_flow
            ),
        }
    }

    /// Wrap an arbitrary base URL as an authority.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url: String = url.into();
        Authority {
            base: url.trim_end_matches('/').to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.base
    }

    pub fn authorize_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/authorize", self.base)
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.base)
    }

    pub fn logout_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/logout", self.base)
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_b2c_authority_url() {
        let authority = Authority::b2c("contoso", "B2C_1_signup");
        assert_eq!(
            authority.as_str(),
            "https://contoso.b2clogin.com/contoso.onmicrosoft.com/B2C_1_signup"
        );
    }

    #[test]
    fn test_endpoints_derive_from_base() {
        let authority = Authority::b2c("contoso", "B2C_1_signupsignin");
        assert!(authority
            .authorize_endpoint()
            .ends_with("/B2C_1_signupsignin/oauth2/v2.0/authorize"));
        assert!(authority
            .token_endpoint()
            .ends_with("/B2C_1_signupsignin/oauth2/v2.0/token"));
    }

    #[test]
    fn test_from_url_trims_trailing_slash() {
        let authority = Authority::from_url("http://127.0.0.1:5000/");
        assert_eq!(
            authority.token_endpoint(),
            "http://127.0.0.1:5000/oauth2/v2.0/token"
        );
    }
}
