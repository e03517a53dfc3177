use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use domain::error::{
    AuthErrorKind, DomainErrorKind, Error as DomainError, ExternalErrorKind, InternalErrorKind,
};

extern crate log;
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl Error {
    /// Message of the innermost error in the chain, which is the one a client can act on.
    fn root_message(&self) -> String {
        let mut current: &dyn StdError = &self.0;
        while let Some(source) = current.source() {
            current = source;
        }
        current.to_string()
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let message = self.root_message();
        match self.0.error_kind {
            DomainErrorKind::Auth(auth_error_kind) => match auth_error_kind {
                AuthErrorKind::MissingCode => {
                    (StatusCode::BAD_REQUEST, "Missing code").into_response()
                }
                AuthErrorKind::InvalidState => {
                    (StatusCode::BAD_REQUEST, "Invalid state").into_response()
                }
                AuthErrorKind::OAuthExchangeFailed => {
                    error!("OAuth callback failed: {message}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("OAuth callback error: {message}"),
                    )
                        .into_response()
                }
                AuthErrorKind::NotAuthenticated => (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "Not authenticated" })),
                )
                    .into_response(),
                AuthErrorKind::SessionExpired => (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "Session expired, please re-authenticate." })),
                )
                    .into_response(),
            },
            DomainErrorKind::External(external_error_kind) => match external_error_kind {
                ExternalErrorKind::UpstreamFetchFailed => {
                    warn!("Failed to fetch from Backlog: {message}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": "Failed to fetch issues", "details": message })),
                    )
                        .into_response()
                }
                ExternalErrorKind::Network => {
                    (StatusCode::BAD_GATEWAY, "BAD GATEWAY").into_response()
                }
                ExternalErrorKind::Other(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
                }
            },
            DomainErrorKind::Internal(internal_error_kind) => {
                match internal_error_kind {
                    InternalErrorKind::Config => error!("Configuration error: {message}"),
                    InternalErrorKind::Session => error!("Session store error: {message}"),
                    InternalErrorKind::Other(_) => error!("Internal error: {message}"),
                }
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
