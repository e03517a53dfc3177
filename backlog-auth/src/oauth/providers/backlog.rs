//! Backlog OAuth provider implementation.

use async_trait::async_trait;
use log::*;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use url::Url;

use crate::error::{oauth_error, Error, ErrorKind, OAuthErrorKind};
use crate::oauth::token::{TokenPair, TokenResponse};
use crate::oauth::AuthorizationRequest;

/// Path of the authorization page, relative to the space URL.
const AUTHORIZE_PATH: &str = "/OAuth2AccessRequest.action";
/// Path of the token endpoint, relative to the space URL.
const TOKEN_PATH: &str = "/api/v2/oauth2/token";

/// Endpoints of one Backlog space.
#[derive(Debug, Clone)]
pub struct BacklogUrls {
    pub authorize_url: Url,
    pub token_url: Url,
}

impl BacklogUrls {
    /// Derive the OAuth endpoints from a space URL such as `https://acme.backlog.com`.
    pub fn for_space(space_url: &str) -> Result<Self, Error> {
        let base = space_url.trim_end_matches('/');
        let parse = |path: &str| {
            Url::parse(&format!("{base}{path}")).map_err(|e| Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::OAuth(OAuthErrorKind::InvalidEndpoint),
            })
        };

        Ok(Self {
            authorize_url: parse(AUTHORIZE_PATH)?,
            token_url: parse(TOKEN_PATH)?,
        })
    }
}

/// Request to exchange authorization code for tokens
#[derive(Serialize)]
struct TokenExchangeRequest<'a> {
    grant_type: &'static str,
    code: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
}

/// Request to refresh access token
#[derive(Serialize)]
struct TokenRefreshRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
}

/// Backlog OAuth provider.
///
/// Handles the authorization-code grant against a single Backlog space:
/// - Authorization URL generation
/// - Authorization code exchange
/// - Token refresh with rejection classification
pub struct Provider {
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    scope: String,
    urls: BacklogUrls,
    http_client: reqwest::Client,
}

impl Provider {
    /// Create a new Backlog OAuth provider.
    ///
    /// # Arguments
    ///
    /// * `client_id` - Backlog application client ID
    /// * `client_secret` - Backlog application client secret
    /// * `redirect_uri` - Registered OAuth redirect URI
    /// * `scope` - Requested scope (Backlog only knows `read`)
    /// * `urls` - Endpoints of the Backlog space
    /// * `http_client` - Client used for token endpoint calls
    pub fn new(
        client_id: String,
        client_secret: SecretString,
        redirect_uri: String,
        scope: String,
        urls: BacklogUrls,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            scope,
            urls,
            http_client,
        }
    }

    async fn post_token_form<T: Serialize + Sync>(
        &self,
        form: &T,
    ) -> Result<reqwest::Response, Error> {
        // reqwest sets Content-Type: application/x-www-form-urlencoded for .form()
        let response = self
            .http_client
            .post(self.urls.token_url.clone())
            .form(form)
            .send()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl crate::oauth::Provider for Provider {
    fn authorization_url(&self, state: &str) -> AuthorizationRequest {
        let mut url = self.urls.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", state)
            .append_pair("scope", &self.scope);

        AuthorizationRequest {
            url: url.into(),
            state: state.to_string(),
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenPair, Error> {
        let request = TokenExchangeRequest {
            grant_type: "authorization_code",
            code,
            client_id: &self.client_id,
            client_secret: self.client_secret.expose_secret(),
            redirect_uri: &self.redirect_uri,
        };

        debug!("Exchanging Backlog OAuth code for tokens");

        let response = self
            .post_token_form(&request)
            .await
            .inspect_err(|e| warn!("Failed to exchange Backlog OAuth code: {:?}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Backlog OAuth error ({status}): {error_text}");
            return Err(oauth_error(
                OAuthErrorKind::TokenExchangeFailed,
                &format!("token endpoint responded with {status}"),
            ));
        }

        let tokens: TokenResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse Backlog token response: {:?}", e);
            oauth_error(
                OAuthErrorKind::TokenExchangeFailed,
                &format!("invalid token response: {e}"),
            )
        })?;

        info!("Successfully exchanged Backlog OAuth code for tokens");
        Ok(tokens.into())
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, Error> {
        let request = TokenRefreshRequest {
            grant_type: "refresh_token",
            client_id: &self.client_id,
            client_secret: self.client_secret.expose_secret(),
            refresh_token,
        };

        debug!("Refreshing Backlog access token");

        let response = self
            .post_token_form(&request)
            .await
            .inspect_err(|e| warn!("Failed to refresh Backlog token: {:?}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Backlog token refresh error ({status}): {error_text}");
            let kind = match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                    OAuthErrorKind::TokenRefreshRejected
                }
                _ => OAuthErrorKind::TokenRefreshFailed,
            };
            return Err(oauth_error(
                kind,
                &format!("token endpoint responded with {status}"),
            ));
        }

        let tokens: TokenResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse Backlog token refresh response: {:?}", e);
            oauth_error(
                OAuthErrorKind::TokenRefreshFailed,
                &format!("invalid token response: {e}"),
            )
        })?;

        info!("Successfully refreshed Backlog access token");
        Ok(tokens.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpErrorKind;
    use crate::oauth::Provider as _;
    use mockito::{Matcher, Server};

    fn provider_for(space_url: &str) -> Provider {
        Provider::new(
            "client-123".to_string(),
            SecretString::new("secret-456".to_string()),
            "http://localhost:3001/auth/callback".to_string(),
            "read".to_string(),
            BacklogUrls::for_space(space_url).unwrap(),
            reqwest::Client::new(),
        )
    }

    #[test]
    fn test_urls_for_space_strip_trailing_slash() {
        let urls = BacklogUrls::for_space("https://acme.backlog.com/").unwrap();
        assert_eq!(
            urls.authorize_url.as_str(),
            "https://acme.backlog.com/OAuth2AccessRequest.action"
        );
        assert_eq!(
            urls.token_url.as_str(),
            "https://acme.backlog.com/api/v2/oauth2/token"
        );
    }

    #[test]
    fn test_urls_for_space_rejects_garbage() {
        assert!(BacklogUrls::for_space("not a url").is_err());
    }

    #[test]
    fn test_authorization_url_contains_fixed_parameters() {
        let provider = provider_for("https://acme.backlog.com");
        let request = provider.authorization_url("abc123");

        let url = Url::parse(&request.url).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(url.path(), "/OAuth2AccessRequest.action");
        assert_eq!(
            pairs,
            vec![
                ("response_type".to_string(), "code".to_string()),
                ("client_id".to_string(), "client-123".to_string()),
                (
                    "redirect_uri".to_string(),
                    "http://localhost:3001/auth/callback".to_string()
                ),
                ("state".to_string(), "abc123".to_string()),
                ("scope".to_string(), "read".to_string()),
            ]
        );
        assert_eq!(request.state, "abc123");
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/oauth2/token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "the-code".into()),
                Matcher::UrlEncoded("client_id".into(), "client-123".into()),
                Matcher::UrlEncoded("client_secret".into(), "secret-456".into()),
                Matcher::UrlEncoded(
                    "redirect_uri".into(),
                    "http://localhost:3001/auth/callback".into(),
                ),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"acc","refresh_token":"ref","token_type":"Bearer","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let tokens = provider_for(&server.url())
            .exchange_code("the-code")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(tokens.access_token.expose_secret(), "acc");
        assert_eq!(
            tokens.refresh_token.unwrap().expose_secret().as_str(),
            "ref"
        );
    }

    #[tokio::test]
    async fn test_exchange_code_non_success_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v2/oauth2/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let err = provider_for(&server.url())
            .exchange_code("bad-code")
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::OAuth(OAuthErrorKind::TokenExchangeFailed)
        );
        assert!(err.to_string().contains("400"));
        assert!(!err.to_string().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn test_exchange_code_malformed_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v2/oauth2/token")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = provider_for(&server.url())
            .exchange_code("code")
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::OAuth(OAuthErrorKind::TokenExchangeFailed)
        );
    }

    #[tokio::test]
    async fn test_exchange_code_network_failure() {
        // Nothing listens on this port.
        let err = provider_for("http://127.0.0.1:9")
            .exchange_code("code")
            .await
            .unwrap_err();

        assert!(matches!(err.error_kind, ErrorKind::Http(_)));
        assert_ne!(
            err.error_kind,
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        );
    }

    #[tokio::test]
    async fn test_refresh_token_success_without_rotation() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/oauth2/token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "r-old".into()),
                Matcher::UrlEncoded("client_id".into(), "client-123".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token":"a-new"}"#)
            .expect(1)
            .create_async()
            .await;

        let tokens = provider_for(&server.url())
            .refresh_token("r-old")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(tokens.access_token.expose_secret(), "a-new");
        assert!(tokens.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_refresh_token_rejected_statuses_are_irrecoverable() {
        for status in [400, 401] {
            let mut server = Server::new_async().await;
            let _mock = server
                .mock("POST", "/api/v2/oauth2/token")
                .with_status(status)
                .create_async()
                .await;

            let err = provider_for(&server.url())
                .refresh_token("r-old")
                .await
                .unwrap_err();

            assert_eq!(
                err.error_kind,
                ErrorKind::OAuth(OAuthErrorKind::TokenRefreshRejected)
            );
            assert!(err.is_irrecoverable());
        }
    }

    #[tokio::test]
    async fn test_refresh_token_server_error_is_transient() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v2/oauth2/token")
            .with_status(503)
            .create_async()
            .await;

        let err = provider_for(&server.url())
            .refresh_token("r-old")
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::OAuth(OAuthErrorKind::TokenRefreshFailed)
        );
        assert!(!err.is_irrecoverable());
    }
}
