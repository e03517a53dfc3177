//! # backlog-auth
//!
//! Authentication infrastructure for talking to a Backlog space on behalf of a user:
//! - OAuth 2.0 authorization-code flow (authorization URL, code exchange)
//! - Token pairs and the `TokenStore` abstraction over wherever they live
//! - Token refresh with irrecoverable/transient classification and per-session guards
//! - CSRF state generation and validation
//! - HTTP client building
//!
//! ## Usage
//!
//! ```rust,ignore
//! use backlog_auth::{
//!     http::HttpClientBuilder,
//!     oauth::{providers::backlog, StateManager, token::{Refresher, TokenStore}},
//! };
//! ```

pub mod error;
pub mod http;
pub mod oauth;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
