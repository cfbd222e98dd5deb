//! Credential management.
//!
//! - [`Credential`]: client identity, app token and optional user token
//! - [`lifecycle`]: expiry-driven refresh and degrade operations
//! - [`CachedCredential`]: persisted tokens, reloaded at startup

mod cache;
pub mod lifecycle;
mod types;

pub use cache::CachedCredential;
pub use lifecycle::{AppTokenRefresh, UserTokenStatus};
pub use types::{ClientCredentials, Credential, Token};
