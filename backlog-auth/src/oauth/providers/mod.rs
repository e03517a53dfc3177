//! OAuth provider implementations.

pub mod backlog;
