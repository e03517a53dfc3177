//! OAuth provider trait and types.

use async_trait::async_trait;

use super::token::TokenPair;
use crate::error::Error;

/// Authorization request with URL and the state value embedded in it.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Authorization URL to redirect the user to.
    pub url: String,
    /// CSRF state parameter for validation.
    pub state: String,
}

/// Trait for OAuth 2.0 providers speaking the authorization-code grant.
///
/// Implementations handle:
/// - Authorization URL generation
/// - Authorization code exchange for a token pair
/// - Token refresh, classifying rejected refresh tokens as irrecoverable
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the authorization URL the user agent is redirected to.
    ///
    /// # Arguments
    ///
    /// * `state` - CSRF state parameter echoed back on the callback
    fn authorization_url(&self, state: &str) -> AuthorizationRequest;

    /// Exchange an authorization code for access and refresh tokens.
    ///
    /// # Arguments
    ///
    /// * `code` - Authorization code from the OAuth callback
    async fn exchange_code(&self, code: &str) -> Result<TokenPair, Error>;

    /// Refresh an access token using a refresh token.
    ///
    /// A rejection of the refresh token itself must be reported as
    /// `OAuthErrorKind::TokenRefreshRejected`; everything else as a transient failure.
    ///
    /// # Arguments
    ///
    /// * `refresh_token` - The refresh token
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, Error>;
}
