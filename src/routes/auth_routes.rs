//! Interactive sign-in flow endpoints.

use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{AppendHeaders, IntoResponse, Redirect};
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::client::Authority;
use crate::models::{AuthCodeFlow, CallbackParams};
use crate::session::Session;
use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

/// Session key holding the in-flight auth-code flow state.
const AUTH_FLOW_KEY: &str = "auth_flow";
/// Session key holding the signed-in user's id_token claims.
const USER_KEY: &str = "user";

/// Registers sign-in flow routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/authorize", get(authorize))
        .route("/logout", get(logout))
        .route("/me", get(me))
}

#[derive(Deserialize)]
struct LoginParams {
    /// `editprofile` sends the user through the profile-edit user flow
    /// instead of sign-up/sign-in.
    flow: Option<String>,
}

/// Starts an authorization-code flow and sends the user to the identity
/// provider. The flow state is stashed in the session for `/authorize`.
async fn login(
    session: Session,
    State(state): State<AppState>,
    Query(params): Query<LoginParams>,
) -> Result<impl IntoResponse, HTTPError> {
    let authority = match params.flow.as_deref() {
        Some("editprofile") => Some(state.config.profile_authority()),
        _ => None,
    };

    let flow = state
        .broker
        .build_auth_code_flow(authority, &state.config.scope_list())
        .map_err(HTTPError::internal)?;

    let blob = serde_json::to_string(&flow).map_err(|e| HTTPError::internal(e.to_string()))?;
    state
        .store
        .set(&session.id, AUTH_FLOW_KEY, &blob)
        .await
        .map_err(HTTPError::internal)?;

    debug!("Session '{}' sent to identity provider", session.id);
    Ok((
        AppendHeaders([(SET_COOKIE, session.cookie())]),
        Redirect::to(&flow.auth_uri),
    ))
}

/// Redirect URI the identity provider sends the user back to. Validates
/// the callback against the stashed flow, exchanges the code, and signs
/// the session in.
async fn authorize(
    session: Session,
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, HTTPError> {
    if let Some(error) = &params.error {
        warn!("Identity provider returned '{}' on callback", error);
        return Err(HTTPError::new(
            StatusCode::BAD_REQUEST,
            format!(
                "{}: {}",
                error,
                params.error_description.as_deref().unwrap_or("")
            ),
        ));
    }

    let flow_blob = state
        .store
        .get(&session.id, AUTH_FLOW_KEY)
        .await
        .map_err(HTTPError::internal)?
        .ok_or_else(|| {
            HTTPError::new(
                StatusCode::BAD_REQUEST,
                "No authorization flow pending for this session",
            )
        })?;
    let flow: AuthCodeFlow =
        serde_json::from_str(&flow_blob).map_err(|e| HTTPError::internal(e.to_string()))?;

    let cache = state
        .broker
        .load_cache(&session.id)
        .await
        .map_err(HTTPError::internal)?;
    let mut client = state
        .broker
        .build_identity_client(Some(cache), Some(Authority::from_url(&flow.authority)));

    let result = client
        .acquire_token_by_auth_code_flow(&flow, &params)
        .await
        .map_err(|e| HTTPError::new(StatusCode::BAD_REQUEST, e))?;

    let mut cache = client.into_cache();
    state
        .broker
        .save_cache(&session.id, &mut cache)
        .await
        .map_err(HTTPError::internal)?;

    if let Some(claims) = &result.id_token_claims {
        let user_blob =
            serde_json::to_string(claims).map_err(|e| HTTPError::internal(e.to_string()))?;
        state
            .store
            .set(&session.id, USER_KEY, &user_blob)
            .await
            .map_err(HTTPError::internal)?;
    }
    state
        .store
        .remove(&session.id, AUTH_FLOW_KEY)
        .await
        .map_err(HTTPError::internal)?;

    debug!(
        "Signed in '{}' on session '{}'",
        result.account.username, session.id
    );
    Ok((
        AppendHeaders([(SET_COOKIE, session.cookie())]),
        Redirect::to("/"),
    ))
}

/// Clears the session and sends the user to the provider's logout endpoint.
async fn logout(
    session: Session,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, HTTPError> {
    state
        .store
        .clear(&session.id)
        .await
        .map_err(HTTPError::internal)?;

    let mut logout_url = Url::parse(&state.config.authority().logout_endpoint())
        .map_err(|e| HTTPError::internal(e.to_string()))?;
    logout_url
        .query_pairs_mut()
        .append_pair("post_logout_redirect_uri", &state.config.url_base);

    Ok(Redirect::to(logout_url.as_str()))
}

/// The signed-in user's id_token claims, as stored at sign-in.
async fn me(
    session: Session,
    State(state): State<AppState>,
) -> Result<Json<Value>, HTTPError> {
    let user = state
        .store
        .get(&session.id, USER_KEY)
        .await
        .map_err(HTTPError::internal)?
        .ok_or_else(|| HTTPError::new(StatusCode::UNAUTHORIZED, "Not signed in"))?;

    let claims: Value =
        serde_json::from_str(&user).map_err(|e| HTTPError::internal(e.to_string()))?;
    Ok(Json(claims))
}
