//! Backlog API client.
//!
//! Every authenticated call to Backlog goes through [`Backlog::call_api`], which
//! attaches the session's bearer token and, when Backlog reports it stale, refreshes
//! the token once and retries the call once.

use std::time::Duration;

use backlog_auth::http::HttpClientBuilder;
use backlog_auth::oauth::providers::backlog::{BacklogUrls, Provider as BacklogProvider};
use backlog_auth::oauth::token::{Refresher, TokenStore};
use backlog_auth::oauth::StateManager;
use bytes::Bytes;
use log::*;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use service::config::Config;
use url::Url;

use crate::error::{
    AuthErrorKind, DomainErrorKind, Error, ExternalErrorKind, InternalErrorKind,
};

/// Path of the issue search endpoint, relative to the space URL.
const ISSUES_PATH: &str = "/api/v2/issues";

/// Everything needed to talk to one Backlog space on behalf of its users.
#[derive(Debug, Clone)]
pub struct BacklogSettings {
    pub space_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_uri: String,
    pub scope: String,
    pub timeout: Option<Duration>,
}

impl BacklogSettings {
    /// Collect the Backlog settings from the service configuration. Every OAuth
    /// setting is required.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self {
            space_url: required(config.backlog_space_url(), "BACKLOG_SPACE_URL")?,
            client_id: required(config.backlog_client_id(), "BACKLOG_CLIENT_ID")?,
            client_secret: SecretString::new(required(
                config.backlog_client_secret(),
                "BACKLOG_CLIENT_SECRET",
            )?),
            redirect_uri: required(config.backlog_redirect_uri(), "BACKLOG_REDIRECT_URI")?,
            scope: config.backlog_oauth_scope().to_string(),
            timeout: config.upstream_timeout_secs().map(Duration::from_secs),
        })
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, Error> {
    value.filter(|v| !v.is_empty()).ok_or_else(|| {
        warn!("{name} is not configured");
        Error::new(
            DomainErrorKind::Internal(InternalErrorKind::Config),
            &format!("{name} is not configured"),
        )
    })
}

/// Result of a single bearer-authenticated GET.
enum Outcome {
    Success(Bytes),
    /// Backlog rejected the access token.
    Unauthorized,
    /// Backlog refused the request outright.
    BadRequest,
    Failed(Error),
}

impl Outcome {
    fn into_result(self) -> Result<Bytes, Error> {
        match self {
            Outcome::Success(body) => Ok(body),
            Outcome::Unauthorized => Err(upstream_status_error(StatusCode::UNAUTHORIZED)),
            Outcome::BadRequest => Err(upstream_status_error(StatusCode::BAD_REQUEST)),
            Outcome::Failed(err) => Err(err),
        }
    }
}

fn upstream_status_error(status: StatusCode) -> Error {
    Error::new(
        DomainErrorKind::External(ExternalErrorKind::UpstreamFetchFailed),
        &format!("Backlog responded with {status}"),
    )
}

/// Backlog API client shared by all requests.
///
/// Holds the OAuth provider of the configured space together with the process-wide
/// CSRF state registry and the per-session refresh guards.
pub struct Backlog {
    provider: BacklogProvider,
    refresher: Refresher,
    states: StateManager,
    http_client: reqwest::Client,
    issues_url: Url,
}

impl Backlog {
    pub fn new(settings: BacklogSettings) -> Result<Self, Error> {
        let http_client = HttpClientBuilder::new()
            .with_timeout(settings.timeout)
            .build()?;

        let urls = BacklogUrls::for_space(&settings.space_url)?;
        let issues_url = Url::parse(&format!(
            "{}{ISSUES_PATH}",
            settings.space_url.trim_end_matches('/')
        ))
        .map_err(|e| Error::wrap(DomainErrorKind::Internal(InternalErrorKind::Config), e))?;

        let provider = BacklogProvider::new(
            settings.client_id,
            settings.client_secret,
            settings.redirect_uri,
            settings.scope,
            urls,
            http_client.clone(),
        );

        Ok(Self {
            provider,
            refresher: Refresher::new(),
            states: StateManager::new(),
            http_client,
            issues_url,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Self::new(BacklogSettings::from_config(config)?)
    }

    pub fn issues_url(&self) -> &Url {
        &self.issues_url
    }

    pub(crate) fn provider(&self) -> &BacklogProvider {
        &self.provider
    }

    pub(crate) fn states(&self) -> &StateManager {
        &self.states
    }

    /// GET `url` with the session's access token and return the body untouched.
    ///
    /// A 401 from Backlog while the session holds a refresh token triggers exactly one
    /// refresh followed by exactly one retry; the retry's result is final. A refresh
    /// rejected by Backlog, or a retry answered with 400 or 401, destroys the session
    /// and yields `SessionExpired`. Any other failure is returned as is and leaves the
    /// session alone.
    pub async fn call_api<S>(&self, store: &S, url: &Url) -> Result<Bytes, Error>
    where
        S: TokenStore + ?Sized,
    {
        let access_token = store
            .access_token()
            .await?
            .ok_or_else(|| Error::auth(AuthErrorKind::NotAuthenticated))?;

        match self.get(url, &access_token).await {
            Outcome::Unauthorized => {}
            outcome => return outcome.into_result(),
        }

        if store.refresh_token().await?.is_none() {
            debug!("Backlog rejected the access token and the session has no refresh token");
            return Outcome::Unauthorized.into_result();
        }

        info!("Backlog rejected the access token, refreshing");
        let access_token = match self.refresher.refresh(&self.provider, store).await {
            Ok(access_token) => access_token,
            Err(err) if err.is_irrecoverable() => {
                warn!("Refresh token rejected, destroying session: {err}");
                return Err(expire_session(
                    store,
                    Error::wrap(DomainErrorKind::Auth(AuthErrorKind::SessionExpired), err),
                )
                .await);
            }
            Err(err) => {
                warn!("Token refresh failed: {err}");
                return Err(err.into());
            }
        };

        match self.get(url, &access_token).await {
            Outcome::Unauthorized | Outcome::BadRequest => {
                warn!("Backlog rejected the refreshed access token, destroying session");
                Err(expire_session(
                    store,
                    Error::new(
                        DomainErrorKind::Auth(AuthErrorKind::SessionExpired),
                        "Backlog rejected the refreshed access token",
                    ),
                )
                .await)
            }
            outcome => outcome.into_result(),
        }
    }

    async fn get(&self, url: &Url, access_token: &SecretString) -> Outcome {
        trace!("GET {url}");

        let response = match self
            .http_client
            .get(url.clone())
            .bearer_auth(access_token.expose_secret())
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!("Failed to reach Backlog: {err}");
                return Outcome::Failed(err.into());
            }
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Outcome::Unauthorized;
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Backlog API error ({status}): {error_text}");
            if status == StatusCode::BAD_REQUEST {
                return Outcome::BadRequest;
            }
            return Outcome::Failed(upstream_status_error(status));
        }

        match response.bytes().await {
            Ok(body) => Outcome::Success(body),
            Err(err) => Outcome::Failed(err.into()),
        }
    }
}

/// Destroy the session and hand back `err`. The caller answers `SessionExpired` even
/// when the session store cannot be flushed.
async fn expire_session<S>(store: &S, err: Error) -> Error
where
    S: TokenStore + ?Sized,
{
    if let Err(e) = store.destroy().await {
        warn!("Failed to destroy expired session: {e}");
    }
    err
}
