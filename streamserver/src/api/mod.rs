//! Delivery interface.
//!
//! Serves the latest snapshot to local clients, forwards "refresh now"
//! requests to the orchestrator and drives the OAuth authorization flow.

pub mod error;
pub mod routes;
pub mod server;

pub use error::{ApiError, ApiResult};
pub use server::{ApiServer, ApiServerConfig, AppState, normalize_address};
