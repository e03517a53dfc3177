//! Token store trait over whatever holds a user's credential pair.

use async_trait::async_trait;
use secrecy::SecretString;

use super::TokenPair;
use crate::error::Error;

/// Trait for reading and mutating the token pair belonging to one user session.
///
/// The web layer implements this over the HTTP session; tests use
/// [`MemoryTokenStore`](super::MemoryTokenStore). A store with no access token is
/// unauthenticated.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Stable identifier of the session the tokens belong to, if one has been
    /// assigned yet. Used to serialize refreshes for the same session.
    fn session_key(&self) -> Option<String>;

    /// Current access token, if any.
    async fn access_token(&self) -> Result<Option<SecretString>, Error>;

    /// Current refresh token, if any.
    async fn refresh_token(&self) -> Result<Option<SecretString>, Error>;

    /// Overwrite the access token.
    async fn set_access_token(&self, token: &SecretString) -> Result<(), Error>;

    /// Overwrite the refresh token.
    async fn set_refresh_token(&self, token: &SecretString) -> Result<(), Error>;

    /// Clear every field and invalidate the session identifier.
    async fn destroy(&self) -> Result<(), Error>;

    /// Write a token pair: the access token always, the refresh token only when
    /// the pair carries one so a previously issued refresh token is retained.
    async fn store(&self, tokens: &TokenPair) -> Result<(), Error> {
        self.set_access_token(&tokens.access_token).await?;
        if let Some(refresh_token) = &tokens.refresh_token {
            self.set_refresh_token(refresh_token).await?;
        }
        Ok(())
    }
}
