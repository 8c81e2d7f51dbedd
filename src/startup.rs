//! Application startup and server initialization.
//!
//! Creates the session store and token broker, wires up the routes, and
//! serves until shutdown.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::broker::SessionTokenBroker;
use crate::config::Config;
use crate::routes;
use crate::session::create_session_store;
use crate::state::AppState;

/// Initializes and runs the application server.
///
/// # Errors
///
/// Returns an error if the server fails to bind to the configured address
/// or encounters a runtime error during execution.
pub async fn run(config: Arc<Config>) -> Result<(), Box<dyn std::error::Error>> {
    let store = create_session_store(&config.session_store).await;
    let broker = Arc::new(SessionTokenBroker::new(config.clone(), store.clone()));

    info!(
        "Starting server on {} for tenant '{}'",
        config.bind_address, config.tenant
    );

    let state = AppState {
        config: config.clone(),
        broker,
        store,
    };

    let app = routes::create_router(state);

    let listener = TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
