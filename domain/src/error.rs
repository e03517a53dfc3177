//! Error types for the `domain` layer.
use backlog_auth::error::{Error as BacklogAuthError, ErrorKind as BacklogAuthErrorKind};
use backlog_auth::error::{OAuthErrorKind, TokenErrorKind};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. The intent is to translate errors between layers while maintaining
/// layer boundaries. Ex. `domain` is dependent on `backlog_auth`, and `web` is dependent on
/// `domain`, but `web` should not be dependent, directly, on `backlog_auth`. Ultimately the
/// various `error_kind`s are used by `web` to return appropriate HTTP status codes and
/// messages to the client.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
    Auth(AuthErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Config,
    /// Reading or writing the session that holds the user's tokens failed.
    Session,
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    /// Backlog answered a proxied call with an error, or the call could not be completed.
    UpstreamFetchFailed,
    Other(String),
}

/// Errors tied to the user's OAuth credential.
#[derive(Debug, PartialEq)]
pub enum AuthErrorKind {
    MissingCode,
    InvalidState,
    OAuthExchangeFailed,
    NotAuthenticated,
    /// The refresh credential was rejected and the session has been destroyed.
    SessionExpired,
}

impl Error {
    pub(crate) fn new(error_kind: DomainErrorKind, message: &str) -> Self {
        Error {
            source: Some(message.to_string().into()),
            error_kind,
        }
    }

    pub(crate) fn wrap(
        error_kind: DomainErrorKind,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Error {
            source: Some(Box::new(source)),
            error_kind,
        }
    }

    pub(crate) fn auth(kind: AuthErrorKind) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Auth(kind),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{source}"),
            None => write!(f, "{:?}", self.error_kind),
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
        // Errors that result from issues building the request. This type of error
        // occurs prior to any network calls being made.
        if err.is_builder() {
            Error::wrap(
                DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest request".to_string(),
                )),
                err,
            )
        // Errors that result from issues with the network call itself.
        } else {
            Error::wrap(DomainErrorKind::External(ExternalErrorKind::Network), err)
        }
    }
}

// This is where we translate errors from the `backlog_auth` layer to the `domain` layer.
impl From<BacklogAuthError> for Error {
    fn from(err: BacklogAuthError) -> Self {
        let error_kind = match &err.error_kind {
            BacklogAuthErrorKind::Http(_) => DomainErrorKind::External(ExternalErrorKind::Network),
            BacklogAuthErrorKind::OAuth(OAuthErrorKind::TokenExchangeFailed) => {
                DomainErrorKind::Auth(AuthErrorKind::OAuthExchangeFailed)
            }
            BacklogAuthErrorKind::OAuth(OAuthErrorKind::TokenRefreshRejected)
            | BacklogAuthErrorKind::Token(TokenErrorKind::NoRefreshToken) => {
                DomainErrorKind::Auth(AuthErrorKind::SessionExpired)
            }
            BacklogAuthErrorKind::OAuth(OAuthErrorKind::TokenRefreshFailed) => {
                DomainErrorKind::External(ExternalErrorKind::Other(
                    "Token refresh failed".to_string(),
                ))
            }
            BacklogAuthErrorKind::OAuth(OAuthErrorKind::InvalidEndpoint) => {
                DomainErrorKind::Internal(InternalErrorKind::Config)
            }
            BacklogAuthErrorKind::Token(TokenErrorKind::Storage) => {
                DomainErrorKind::Internal(InternalErrorKind::Session)
            }
        };
        Error::wrap(error_kind, err)
    }
}
