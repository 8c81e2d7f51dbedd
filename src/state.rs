//! Shared application state.

use std::sync::Arc;

use crate::broker::SessionTokenBroker;
use crate::config::Config;
use crate::session::SessionStore;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request handler; holds the configuration, the token broker,
/// and the session store.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<Config>,
    /// The session token broker mediating between sessions and the IdP.
    pub broker: Arc<SessionTokenBroker>,
    /// Server-side web session storage.
    pub store: Arc<dyn SessionStore>,
}
