use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

pub(crate) mod health_check_controller;
pub(crate) mod issue_controller;
pub(crate) mod oauth_controller;

/// 302 Found pointing the user agent at `location`.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
