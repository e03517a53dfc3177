//! CSRF state management for OAuth flows.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// Manager for OAuth state parameters with expiration.
///
/// Generates and validates single-use CSRF state tokens for the authorization redirect.
#[derive(Clone)]
pub struct StateManager {
    states: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
    ttl: Duration,
}

impl StateManager {
    /// Create a new state manager with default TTL of 10 minutes.
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(10))
    }

    /// Create a new state manager with custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Generate a new state token and remember it until it expires.
    ///
    /// Expired entries are swept on every call so abandoned logins don't accumulate.
    pub fn generate(&self) -> String {
        let state = Self::generate_token();
        let now = Utc::now();

        let mut states = self.states();
        states.retain(|_, expires_at| *expires_at > now);
        states.insert(state.clone(), now + self.ttl);

        state
    }

    /// Validate and consume a state token.
    ///
    /// Returns `true` only for a known, unexpired token; the token is removed either way.
    pub fn validate(&self, state: &str) -> bool {
        match self.states().remove(state) {
            Some(expires_at) => Utc::now() <= expires_at,
            None => false,
        }
    }

    fn states(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Generate a cryptographically random state token.
    fn generate_token() -> String {
        let random_bytes: [u8; 32] = rand::thread_rng().gen();
        hex::encode(random_bytes)
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}
