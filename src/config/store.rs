use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::session::mongodb_store::MongoDBSessionConfig;

/// Where the per-user web sessions (and with them the token cache blobs)
/// are kept. The memory backend is single-process only; MongoDB is the
/// backend to use when the service runs behind more than one instance.
#[derive(Deserialize, Serialize, Debug, JsonSchema, Clone)]
#[serde(tag = "type")]
pub enum SessionStoreConfig {
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "mongo")]
    MongoDB(MongoDBSessionConfig),
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        SessionStoreConfig::Memory
    }
}
