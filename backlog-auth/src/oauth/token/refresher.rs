//! Token refresher with per-session refresh guards.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use log::*;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;

use super::{TokenPair, TokenStore};
use crate::error::{token_error, Error, TokenErrorKind};
use crate::oauth::Provider;

/// How long a completed refresh may be handed to a request that raced it.
const REUSE_WINDOW_SECS: i64 = 30;

/// Outcome of the last refresh performed for a session.
struct RecentRefresh {
    /// Refresh token that was spent to obtain `tokens`.
    rotated_from: SecretString,
    tokens: TokenPair,
    refreshed_at: DateTime<Utc>,
}

impl RecentRefresh {
    fn is_fresh(&self) -> bool {
        Utc::now() - self.refreshed_at <= Duration::seconds(REUSE_WINDOW_SECS)
    }
}

type Guard = Arc<Mutex<Option<RecentRefresh>>>;

/// Exchanges a session's refresh token for a new token pair and writes it back.
///
/// Refreshes for the same session are serialized. Without that, two concurrent
/// requests holding the same refresh token would both spend it; the second would
/// be rejected once the provider rotates the credential and the session would be
/// torn down for nothing. A request that waited on the guard and still carries the
/// refresh token that was just spent receives the freshly issued pair instead.
#[derive(Default)]
pub struct Refresher {
    guards: DashMap<String, Guard>,
}

impl Refresher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh the access token held by `store`.
    ///
    /// On success the store holds the new access token (and the new refresh token
    /// when the provider rotated it) and the new access token is returned.
    ///
    /// Errors for which [`Error::is_irrecoverable`] is true mean the caller must
    /// destroy the session; any other error leaves the session intact.
    pub async fn refresh<P, S>(&self, provider: &P, store: &S) -> Result<SecretString, Error>
    where
        P: Provider + ?Sized,
        S: TokenStore + ?Sized,
    {
        let refresh_token = store.refresh_token().await?.ok_or_else(|| {
            token_error(TokenErrorKind::NoRefreshToken, "No refresh token available")
        })?;

        let Some(session_key) = store.session_key() else {
            // A session without an identifier has never been persisted, so nothing
            // else can be refreshing it.
            let tokens = Self::exchange(provider, store, &refresh_token).await?;
            return Ok(tokens.access_token);
        };

        self.prune_idle();

        let guard = self
            .guards
            .entry(session_key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();
        let mut recent = guard.lock().await;

        if let Some(previous) = recent.as_ref() {
            if previous.is_fresh()
                && previous.rotated_from.expose_secret() == refresh_token.expose_secret()
            {
                debug!("Token was refreshed by a concurrent request for session {session_key}");
                store.store(&previous.tokens).await?;
                return Ok(previous.tokens.access_token.clone());
            }
        }

        let tokens = Self::exchange(provider, store, &refresh_token).await?;
        let access_token = tokens.access_token.clone();
        *recent = Some(RecentRefresh {
            rotated_from: refresh_token,
            tokens,
            refreshed_at: Utc::now(),
        });

        debug!("Token refreshed successfully for session {session_key}");
        Ok(access_token)
    }

    async fn exchange<P, S>(
        provider: &P,
        store: &S,
        refresh_token: &SecretString,
    ) -> Result<TokenPair, Error>
    where
        P: Provider + ?Sized,
        S: TokenStore + ?Sized,
    {
        let tokens = provider
            .refresh_token(refresh_token.expose_secret())
            .await?;
        store.store(&tokens).await?;
        Ok(tokens)
    }

    /// Drop guards nobody is waiting on whose last refresh is too old to reuse.
    fn prune_idle(&self) {
        self.guards.retain(|_, guard| {
            if Arc::strong_count(guard) > 1 {
                return true;
            }
            match guard.try_lock() {
                Ok(recent) => recent.as_ref().is_some_and(RecentRefresh::is_fresh),
                Err(_) => true,
            }
        });
    }

    #[cfg(test)]
    fn guard_count(&self) -> usize {
        self.guards.len()
    }
}
