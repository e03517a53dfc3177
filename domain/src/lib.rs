//! Business operations of the Backlog relay.
//!
//! `oauth` drives the authorization-code handshake, `issue` searches issues on the
//! user's behalf and `gateway::backlog` owns every authenticated call to Backlog,
//! including the refresh-and-retry-once policy.

pub mod error;
pub mod gateway;
pub mod issue;
pub mod oauth;

/// Re-exports of the token store contract from `backlog_auth`, so that `web` can back it
/// with the HTTP session without reaching into the auth crate.
pub mod token {
    pub use backlog_auth::error::{storage_error, Error};
    pub use backlog_auth::oauth::token::{MemoryTokenStore, TokenStore};
    pub use secrecy::{ExposeSecret, SecretString};
}
