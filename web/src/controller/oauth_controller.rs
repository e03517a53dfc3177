//! Controller for the Backlog OAuth handshake.
//!
//! Note: these endpoints are reached through browser redirects, so they answer with
//! redirects and plain-text errors rather than JSON.

use crate::controller::found;
use crate::extractors::session_tokens::SessionTokens;
use crate::{AppState, Error};

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use domain::oauth;
use log::*;
use serde::Deserialize;
use serde_json::json;

/// Query parameters Backlog appends when redirecting back to us
#[derive(Debug, Deserialize)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// GET /auth/login
///
/// Starts the authorization-code flow by redirecting to Backlog's authorization page.
#[utoipa::path(
    get,
    path = "/auth/login",
    responses(
        (status = 302, description = "Redirect to the Backlog authorization page"),
        (status = 429, description = "Too many authentication attempts"),
    )
)]
pub async fn login(State(app_state): State<AppState>) -> impl IntoResponse {
    let url = oauth::authorize_url(&app_state.backlog);
    debug!("Redirecting to Backlog for authorization");
    found(&url)
}

/// GET /auth/callback
///
/// Exchanges the authorization code for tokens, keeps them in the session and sends
/// the user on to the frontend.
#[utoipa::path(
    get,
    path = "/auth/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code from Backlog"),
        ("state" = Option<String>, Query, description = "State issued by /auth/login"),
    ),
    responses(
        (status = 302, description = "Redirect to the frontend on success"),
        (status = 400, description = "Missing code or invalid state", body = String),
        (status = 500, description = "Token exchange failed", body = String),
    )
)]
pub async fn callback(
    State(app_state): State<AppState>,
    tokens: SessionTokens,
    Query(params): Query<OAuthCallback>,
) -> Result<impl IntoResponse, Error> {
    oauth::complete(
        &app_state.backlog,
        &tokens,
        params.code.as_deref(),
        params.state.as_deref(),
    )
    .await?;

    // The session now carries credentials, so it must not keep an id that may have
    // been handed out before login.
    if let Err(e) = tokens.session().cycle_id().await {
        warn!("Failed to cycle session id after login: {e}");
    }

    Ok(found(app_state.config.frontend_base_url()))
}

/// POST /auth/logout
///
/// Destroys the session and its cookie. Always succeeds.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Session destroyed"),
    )
)]
pub async fn logout(tokens: SessionTokens) -> impl IntoResponse {
    if let Err(e) = tokens.session().flush().await {
        warn!("Failed to destroy session on logout: {e}");
    }
    Json(json!({ "success": true }))
}
