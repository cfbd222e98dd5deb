//! Application-wide error types.

use thiserror::Error;

use crate::gateway::GatewayError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
///
/// Anything that reaches the orchestrator as an `Error` is fatal. Soft and
/// degrading upstream failures are classified inside the check cycle and
/// never surface here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Upstream error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Encode error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Refresh orchestrator is not running")]
    OrchestratorStopped,

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
