use axum::http::StatusCode;
use axum::response::IntoResponse;

/// GET a liveness message for the backend
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Backend is up", body = String),
    )
)]
pub async fn root() -> impl IntoResponse {
    (StatusCode::OK, "Backend server is running.")
}

/// GET the health of the API router
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "API router is up and responding to requests", body = String),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "healthy")
}
