//! OAuth 2.0 authentication infrastructure.
//!
//! Provides the authorization-code flow against a Backlog space, CSRF state
//! handling and token lifecycle management.

mod provider;
mod state;

pub mod providers;
pub mod token;

pub use provider::{AuthorizationRequest, Provider};
pub use state::StateManager;
