//! Error types for the `backlog-auth` crate.
//!
//! Follows the same pattern as domain::error with a root Error struct and error kind enums.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for backlog-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in backlog-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    OAuth(OAuthErrorKind),
    Token(TokenErrorKind),
    Http(HttpErrorKind),
}

/// Errors from OAuth operations.
#[derive(Debug, PartialEq)]
pub enum OAuthErrorKind {
    TokenExchangeFailed,
    /// The token endpoint rejected the refresh token itself (400 or 401).
    TokenRefreshRejected,
    /// Refresh failed for a reason that may go away on its own (network, 5xx, bad body).
    TokenRefreshFailed,
    InvalidEndpoint,
}

/// Errors from token management operations.
#[derive(Debug, PartialEq)]
pub enum TokenErrorKind {
    NoRefreshToken,
    Storage,
}

/// Errors from HTTP client operations.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Network,
}

impl Error {
    /// True when the session holding the credential can no longer be used and
    /// the user has to go through the authorization flow again.
    pub fn is_irrecoverable(&self) -> bool {
        matches!(
            self.error_kind,
            ErrorKind::OAuth(OAuthErrorKind::TokenRefreshRejected)
                | ErrorKind::Token(TokenErrorKind::NoRefreshToken)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match &self.error_kind {
            ErrorKind::OAuth(kind) => format!("OAuth error: {:?}", kind),
            ErrorKind::Token(kind) => format!("Token error: {:?}", kind),
            ErrorKind::Http(kind) => format!("HTTP error: {:?}", kind),
        };
        match &self.source {
            Some(source) => write!(f, "{label}: {source}"),
            None => write!(f, "{label}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

/// Helper function to create OAuth errors.
pub fn oauth_error(kind: OAuthErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::OAuth(kind),
    }
}

/// Helper function to create token errors.
pub fn token_error(kind: TokenErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Token(kind),
    }
}

/// Helper function to create storage errors.
pub fn storage_error(message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Token(TokenErrorKind::Storage),
    }
}
