//! In-process token store.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use secrecy::SecretString;

use super::TokenStore;
use crate::error::Error;

#[derive(Debug, Default)]
struct Slots {
    access_token: Option<SecretString>,
    refresh_token: Option<SecretString>,
    destroyed: bool,
}

/// Token store kept entirely in memory, one per logical session.
///
/// Useful for tooling and tests that exercise the token lifecycle without an
/// HTTP session layer.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    key: Option<String>,
    slots: Mutex<Slots>,
}

impl MemoryTokenStore {
    /// Create an empty (unauthenticated) store identified by `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            slots: Mutex::new(Slots::default()),
        }
    }

    /// Create a store already holding the given tokens.
    pub fn with_tokens(
        key: impl Into<String>,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
    ) -> Self {
        let store = Self::new(key);
        {
            let mut slots = store.slots();
            slots.access_token = access_token.map(|t| SecretString::new(t.to_string()));
            slots.refresh_token = refresh_token.map(|t| SecretString::new(t.to_string()));
        }
        store
    }

    /// True once [`TokenStore::destroy`] has been called.
    pub fn is_destroyed(&self) -> bool {
        self.slots().destroyed
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    fn session_key(&self) -> Option<String> {
        self.key.clone()
    }

    async fn access_token(&self) -> Result<Option<SecretString>, Error> {
        Ok(self.slots().access_token.clone())
    }

    async fn refresh_token(&self) -> Result<Option<SecretString>, Error> {
        Ok(self.slots().refresh_token.clone())
    }

    async fn set_access_token(&self, token: &SecretString) -> Result<(), Error> {
        self.slots().access_token = Some(token.clone());
        Ok(())
    }

    async fn set_refresh_token(&self, token: &SecretString) -> Result<(), Error> {
        self.slots().refresh_token = Some(token.clone());
        Ok(())
    }

    async fn destroy(&self) -> Result<(), Error> {
        let mut slots = self.slots();
        slots.access_token = None;
        slots.refresh_token = None;
        slots.destroyed = true;
        Ok(())
    }
}
