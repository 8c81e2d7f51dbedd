use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use tokenbroker::broker::SessionTokenBroker;
use tokenbroker::config::Config;
use tokenbroker::routes::create_router;
use tokenbroker::session::memory_store::MemorySessionStore;
use tokenbroker::session::SessionStore;
use tokenbroker::state::AppState;

pub const TEST_CONFIG: &str = r#"
tenant: contoso
signupsignin_flow: B2C_1_signupsignin
editprofile_flow: B2C_1_editprofile
client_id: client-123
client_secret: secret-456
url_base: https://game.example.com
scopes: "demo.read"
logging:
  level: debug
  format: console
session_store:
  type: memory
"#;

pub fn load_test_config() -> Config {
    Figment::new()
        .merge(Yaml::string(TEST_CONFIG))
        .extract()
        .expect("Failed to parse test config YAML")
}

pub fn build_app(config: Config) -> (Router, AppState) {
    let config = Arc::new(config);
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let broker = Arc::new(SessionTokenBroker::new(config.clone(), store.clone()));

    let state = AppState {
        config,
        broker,
        store,
    };

    (create_router(state.clone()), state)
}

pub fn get_request(path: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .expect("failed to build request")
}

pub fn get_request_with_cookie(path: &str, session_id: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .header("Cookie", format!("sid={}", session_id))
        .body(Body::empty())
        .expect("failed to build request")
}
