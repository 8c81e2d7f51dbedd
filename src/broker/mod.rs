pub mod broker;

// Re-export from broker.rs so we can do "use crate::broker::SessionTokenBroker;"
pub use broker::{SessionTokenBroker, TOKEN_CACHE_KEY};
