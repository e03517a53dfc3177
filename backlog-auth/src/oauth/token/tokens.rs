//! OAuth token types.

use secrecy::SecretString;
use serde::Deserialize;

/// Access/refresh credential pair returned by the token endpoint.
#[derive(Debug, Clone)]
pub struct TokenPair {
    /// Access token for API requests.
    pub access_token: SecretString,
    /// Refresh token for obtaining new access tokens. Refresh responses may omit it,
    /// in which case the previously issued refresh token stays valid.
    pub refresh_token: Option<SecretString>,
}

impl TokenPair {
    pub fn new(access_token: String, refresh_token: Option<String>) -> Self {
        Self {
            access_token: SecretString::new(access_token),
            refresh_token: refresh_token.map(SecretString::new),
        }
    }
}

/// Raw token endpoint response body.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl From<TokenResponse> for TokenPair {
    fn from(response: TokenResponse) -> Self {
        TokenPair::new(response.access_token, response.refresh_token)
    }
}
