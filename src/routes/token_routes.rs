//! Token access for the signed-in session.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Deserialize;

use crate::models::TokenResult;
use crate::session::Session;
use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

/// Registers token routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/token", get(get_token))
}

#[derive(Deserialize)]
struct TokenParams {
    /// Overrides the configured scopes; space- or comma-separated.
    scope: Option<String>,
}

/// Returns a token for the session's signed-in user, silently refreshed
/// from the session cache when needed. A session with no cached account
/// gets a 401: the caller must send the user through `/login` first.
async fn get_token(
    session: Session,
    State(state): State<AppState>,
    Query(params): Query<TokenParams>,
) -> Result<Json<TokenResult>, HTTPError> {
    let scopes: Vec<String> = match &params.scope {
        Some(scope) => scope
            .split([',', ' '])
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => state.config.scope_list(),
    };

    let result = state
        .broker
        .get_token_from_cache(&session.id, &scopes)
        .await
        .map_err(|e| HTTPError::new(StatusCode::BAD_GATEWAY, e))?;

    match result {
        Some(token) => Ok(Json(token)),
        None => Err(HTTPError::new(
            StatusCode::UNAUTHORIZED,
            "Interactive authentication required",
        )),
    }
}
