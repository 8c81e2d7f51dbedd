use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::store::SessionStoreConfig;
use crate::client::Authority;

/// The path the identity provider redirects back to after the user has
/// completed a user flow. Registered as part of the app registration's
/// redirect URI, so it is fixed rather than configurable.
pub const REDIRECT_PATH: &str = "/authorize";

/// Main configuration for the broker service.
///
/// Every B2C field is required: without a tenant, user flows and client
/// credentials there is nothing this service can do, so extraction fails
/// before the server ever binds.
#[derive(Deserialize, Serialize, Debug, JsonSchema, Clone)]
pub struct Config {
    /// Azure AD B2C directory name, e.g. "contoso" for contoso.onmicrosoft.com.
    pub tenant: String,
    /// User flow (policy) id for combined sign-up/sign-in, e.g. "B2C_1_signupsignin".
    pub signupsignin_flow: String,
    /// User flow (policy) id for profile editing, e.g. "B2C_1_editprofile".
    pub editprofile_flow: String,
    /// Application (client) id of the app registration.
    pub client_id: String,
    /// Client secret of the app registration.
    pub client_secret: String,
    /// Externally visible base URL of this web app, e.g. "https://game.example.com".
    pub url_base: String,
    /// Space- or comma-separated scopes requested on login and silent
    /// acquisition. Empty means only the identity scopes implied by the flow.
    #[serde(default)]
    pub scopes: Option<String>,
    /// Application ID URI of the downstream API registration, if any.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub session_store: SessionStoreConfig,
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

impl Config {
    /// The authority for the sign-up/sign-in user flow. This is the default
    /// authority for every operation that does not name one explicitly.
    pub fn authority(&self) -> Authority {
        Authority::b2c(&self.tenant, &self.signupsignin_flow)
    }

    /// The authority for the profile-edit user flow.
    pub fn profile_authority(&self) -> Authority {
        Authority::b2c(&self.tenant, &self.editprofile_flow)
    }

    /// Absolute redirect URI handed to the identity provider.
    pub fn redirect_uri(&self) -> String {
        format!("{}{}", self.url_base.trim_end_matches('/'), REDIRECT_PATH)
    }

    /// The configured scopes as a list, split on commas and whitespace.
    pub fn scope_list(&self) -> Vec<String> {
        self.scopes
            .as_deref()
            .unwrap_or("")
            .split([',', ' '])
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// The figment all configuration is drawn from: an optional `config.yaml`
/// in the working directory, with `B2C_`-prefixed environment variables
/// taking precedence. Nested fields use `__`, e.g. `B2C_LOGGING__LEVEL`.
pub fn config_figment() -> Figment {
    Figment::new()
        .merge(Yaml::file("./config.yaml"))
        .merge(Env::prefixed("B2C_").split("__"))
}

/// Extract a Config from the given figment. Missing required values
/// (tenant, user flows, client id/secret, base URL) surface as errors here.
pub fn try_load_config(figment: &Figment) -> Result<Config, figment::Error> {
    figment.extract::<Config>()
}

/// Load config for the binary. Any missing required value is fatal:
/// the process must not come up half-configured.
pub fn load_config() -> Config {
    match try_load_config(&config_figment()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema).unwrap());
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_YAML: &str = r#"
tenant: contoso
signupsignin_flow: B2C_1_signupsignin
editprofile_flow: B2C_1_editprofile
client_id: client-123
client_secret: secret-456
url_base: https://game.example.com
scopes: "demo.read, demo.write"
"#;

    fn figment_from(yaml: &str) -> Figment {
        Figment::new().merge(Yaml::string(yaml))
    }

    #[test]
    fn test_full_config_extracts() {
        let cfg = try_load_config(&figment_from(FULL_YAML)).expect("config should extract");
        assert_eq!(cfg.tenant, "contoso");
        assert_eq!(cfg.redirect_uri(), "https://game.example.com/authorize");
        assert_eq!(cfg.scope_list(), vec!["demo.read", "demo.write"]);
        assert_eq!(cfg.bind_address, "0.0.0.0:8080");
    }

    /// Each required field missing must fail extraction, so the binary
    /// refuses to start before serving a single request.
    #[test]
    fn test_missing_required_fields_fail() {
        for required in [
            "tenant",
            "signupsignin_flow",
            "editprofile_flow",
            "client_id",
            "client_secret",
            "url_base",
        ] {
            let trimmed: String = FULL_YAML
                .lines()
                .filter(|line| !line.starts_with(&format!("{}:", required)))
                .collect::<Vec<_>>()
                .join("\n");
            let result = try_load_config(&figment_from(&trimmed));
            assert!(result.is_err(), "expected failure without '{}'", required);
        }
    }

    #[test]
    fn test_authority_derivation() {
        let mut yaml = FULL_YAML.to_string();
        yaml = yaml.replace("B2C_1_signupsignin", "B2C_1_signup");
        let cfg = try_load_config(&figment_from(&yaml)).unwrap();
        assert_eq!(
            cfg.authority().as_str(),
            "https://contoso.b2clogin.com/contoso.onmicrosoft.com/B2C_1_signup"
        );
        assert_eq!(
            cfg.profile_authority().as_str(),
            "https://contoso.b2clogin.com/contoso.onmicrosoft.com/B2C_1_editprofile"
        );
    }

    #[test]
    fn test_empty_scopes_yield_empty_list() {
        let without_scopes: String = FULL_YAML
            .lines()
            .filter(|line| !line.starts_with("scopes:"))
            .collect::<Vec<_>>()
            .join("\n");
        let cfg = try_load_config(&figment_from(&without_scopes)).unwrap();
        assert!(cfg.scope_list().is_empty());
    }
}
