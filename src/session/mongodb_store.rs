use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::{ClientOptions, IndexOptions, UpdateOptions};
use mongodb::{Client, Collection, IndexModel};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::SessionStore;

/// The config struct for the MongoDB session backend.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
pub struct MongoDBSessionConfig {
    pub uri: String,
    pub database: String,
    /// Sessions idle longer than this are expired by MongoDB itself.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

fn default_session_ttl_secs() -> u64 {
    86400
}

/// Document shape for one web session.
#[derive(Serialize, Deserialize, Clone, Debug)]
struct SessionDocument {
    _id: ObjectId,
    session_id: String,
    /// Entry key -> blob. Keys are the fixed session keys ("token_cache",
    /// "auth_flow", "user"), never user-supplied strings.
    entries: Document,
    updated_at: DateTime,
}

/// A `SessionStore` backed by MongoDB, for deployments with more than one
/// service instance. A TTL index on `updated_at` bounds session lifetime.
pub struct MongoDBSessionStore {
    sessions: Collection<SessionDocument>,
}

impl MongoDBSessionStore {
    /// Creates a new `MongoDBSessionStore` from the given config.
    /// It initializes the client connection and sets up indexes.
    pub async fn new(config: &MongoDBSessionConfig) -> Result<Self, String> {
        info!("Connecting to MongoDB at URI: {}", config.uri);

        let mut client_options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| format!("Failed to parse MongoDB URI: {}", e))?;
        client_options.app_name = Some("tokenbroker".to_string());

        let client = Client::with_options(client_options)
            .map_err(|e| format!("Failed to create MongoDB client: {}", e))?;

        info!("MongoDB connection established successfully.");

        let database = client.database(&config.database);
        let sessions = database.collection::<SessionDocument>("sessions");

        // 1) Unique index on session_id
        let mut unique_on_session = IndexModel::default();
        unique_on_session.keys = doc! { "session_id": 1 };
        unique_on_session.options = Some(IndexOptions::builder().unique(true).build());

        sessions
            .create_index(unique_on_session, None)
            .await
            .map_err(|e| format!("Failed to create unique index on session_id: {}", e))?;

        // 2) TTL index on updated_at, so stale sessions fall out on their own
        let mut expire_on_updated = IndexModel::default();
        expire_on_updated.keys = doc! { "updated_at": 1 };
        expire_on_updated.options = Some(
            IndexOptions::builder()
                .expire_after(Duration::from_secs(config.session_ttl_secs))
                .build(),
        );

        sessions
            .create_index(expire_on_updated, None)
            .await
            .map_err(|e| format!("Failed to create TTL index on updated_at: {}", e))?;

        Ok(Self { sessions })
    }
}

#[async_trait]
impl SessionStore for MongoDBSessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>, String> {
        let document = self
            .sessions
            .find_one(doc! { "session_id": session_id }, None)
            .await
            .map_err(|e| format!("Failed to load session: {}", e))?;

        Ok(document
            .and_then(|d| d.entries.get_str(key).ok().map(str::to_string)))
    }

    async fn set(&self, session_id: &str, key: &str, value: &str) -> Result<(), String> {
        let mut set = Document::new();
        set.insert(format!("entries.{}", key), value);
        set.insert("updated_at", DateTime::now());

        self.sessions
            .update_one(
                doc! { "session_id": session_id },
                doc! { "$set": set },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await
            .map_err(|e| format!("Failed to write session entry: {}", e))?;
        Ok(())
    }

    async fn remove(&self, session_id: &str, key: &str) -> Result<(), String> {
        let mut unset = Document::new();
        unset.insert(format!("entries.{}", key), "");

        self.sessions
            .update_one(
                doc! { "session_id": session_id },
                doc! { "$unset": unset, "$set": { "updated_at": DateTime::now() } },
                None,
            )
            .await
            .map_err(|e| format!("Failed to remove session entry: {}", e))?;
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<(), String> {
        self.sessions
            .delete_one(doc! { "session_id": session_id }, None)
            .await
            .map_err(|e| format!("Failed to clear session: {}", e))?;
        Ok(())
    }
}
