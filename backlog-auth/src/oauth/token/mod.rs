//! OAuth token management with storage and refresh capabilities.

mod memory;
mod refresher;
mod store;
mod tokens;

pub use memory::MemoryTokenStore;
pub use refresher::Refresher;
pub use store::TokenStore;
pub use tokens::{TokenPair, TokenResponse};
