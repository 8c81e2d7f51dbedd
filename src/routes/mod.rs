//! HTTP route definitions and handlers.
//!
//! Endpoints are grouped by concern: the interactive sign-in flow, token
//! access for the signed-in session, and health checks. Handlers stay thin;
//! token logic lives in the broker.

mod auth_routes;
mod health_routes;
mod token_routes;

use crate::state::AppState;
use axum::Router;

/// Creates the application router with all configured routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(auth_routes::routes())
        .merge(token_routes::routes())
        .merge(health_routes::routes())
        .with_state(state)
}
