use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use domain::token::{storage_error, Error, ExposeSecret, SecretString, TokenStore};
use tower_sessions::Session;

/// Session keys holding the Backlog credential pair.
pub(crate) const ACCESS_TOKEN_KEY: &str = "backlog_token";
pub(crate) const REFRESH_TOKEN_KEY: &str = "backlog_refresh_token";

/// The Backlog tokens of the requesting user, kept server-side in their session.
///
/// Extracting this never fails for a request that passed through the session layer;
/// a session without tokens is simply unauthenticated.
#[derive(Clone, Debug)]
pub struct SessionTokens(Session);

impl SessionTokens {
    pub fn session(&self) -> &Session {
        &self.0
    }

    async fn read(&self, key: &str) -> Result<Option<SecretString>, Error> {
        self.0
            .get::<String>(key)
            .await
            .map(|value| value.map(SecretString::new))
            .map_err(|e| storage_error(&e.to_string()))
    }

    async fn write(&self, key: &str, token: &SecretString) -> Result<(), Error> {
        self.0
            .insert(key, token.expose_secret())
            .await
            .map_err(|e| storage_error(&e.to_string()))
    }
}

impl From<Session> for SessionTokens {
    fn from(session: Session) -> Self {
        Self(session)
    }
}

impl<S> FromRequestParts<S> for SessionTokens
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        Ok(Self(session))
    }
}

#[async_trait]
impl TokenStore for SessionTokens {
    fn session_key(&self) -> Option<String> {
        self.0.id().map(|id| id.to_string())
    }

    async fn access_token(&self) -> Result<Option<SecretString>, Error> {
        self.read(ACCESS_TOKEN_KEY).await
    }

    async fn refresh_token(&self) -> Result<Option<SecretString>, Error> {
        self.read(REFRESH_TOKEN_KEY).await
    }

    async fn set_access_token(&self, token: &SecretString) -> Result<(), Error> {
        self.write(ACCESS_TOKEN_KEY, token).await
    }

    async fn set_refresh_token(&self, token: &SecretString) -> Result<(), Error> {
        self.write(REFRESH_TOKEN_KEY, token).await
    }

    async fn destroy(&self) -> Result<(), Error> {
        self.0
            .flush()
            .await
            .map_err(|e| storage_error(&e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    fn new_session() -> SessionTokens {
        SessionTokens::from(Session::new(None, Arc::new(MemoryStore::default()), None))
    }

    #[tokio::test]
    async fn test_new_session_is_unauthenticated() {
        let tokens = new_session();

        assert!(tokens.access_token().await.unwrap().is_none());
        assert!(tokens.refresh_token().await.unwrap().is_none());
        assert!(tokens.session_key().is_none());
    }

    #[tokio::test]
    async fn test_tokens_are_kept_under_session_keys() {
        let tokens = new_session();

        tokens
            .set_access_token(&SecretString::new("access-1".to_string()))
            .await
            .unwrap();
        tokens
            .set_refresh_token(&SecretString::new("refresh-1".to_string()))
            .await
            .unwrap();

        let stored: Option<String> = tokens.session().get(ACCESS_TOKEN_KEY).await.unwrap();
        assert_eq!(stored.as_deref(), Some("access-1"));
        let refresh = tokens.refresh_token().await.unwrap().unwrap();
        assert_eq!(refresh.expose_secret(), "refresh-1");
    }

    #[tokio::test]
    async fn test_destroy_clears_tokens() {
        let tokens = new_session();
        tokens
            .set_access_token(&SecretString::new("access-1".to_string()))
            .await
            .unwrap();

        tokens.destroy().await.unwrap();

        assert!(tokens.access_token().await.unwrap().is_none());
    }
}
