use crate::extractors::session_tokens::SessionTokens;
use crate::{AppState, Error};

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use domain::issue;
use log::*;

/// GET issues from Backlog
///
/// Every query parameter is forwarded to Backlog's issue search as is, in order.
#[utoipa::path(
    get,
    path = "/api/issues",
    params(
        ("keyword" = Option<String>, Query, description = "Full text search term"),
        ("count" = Option<u32>, Query, description = "Maximum number of issues to return"),
    ),
    responses(
        (status = 200, description = "Backlog's issue list, unchanged"),
        (status = 401, description = "Not authenticated, or the session expired"),
        (status = 429, description = "Too many requests"),
        (status = 500, description = "Backlog could not be queried"),
    )
)]
pub async fn index(
    State(app_state): State<AppState>,
    tokens: SessionTokens,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET issues with {} query parameter(s)", params.len());

    let body = issue::search(&app_state.backlog, &tokens, &params).await?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}
