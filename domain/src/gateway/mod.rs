//! Clients for the third-party services this backend talks to.

pub mod backlog;
