//! Upstream error types.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by upstream providers.
///
/// The check cycle only branches on [`GatewayError::Unauthorized`],
/// [`GatewayError::DeadlineExceeded`] and, for the secondary provider,
/// [`GatewayError::Unavailable`]. Everything else is fatal to the daemon.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The provider rejected the credential.
    #[error("unauthorized")]
    Unauthorized,

    /// The request did not finish within its deadline.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Provider-specific soft failure (maintenance, empty or garbled body).
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Unexpected HTTP status.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// Transport error.
    #[error("http error: {0}")]
    Http(reqwest::Error),

    /// Body could not be decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl GatewayError {
    #[inline]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    #[inline]
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded)
    }

    /// Map a non-success status. 401 is always `Unauthorized`.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            Self::Unauthorized
        } else {
            Self::Status {
                status: status.as_u16(),
                body,
            }
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::DeadlineExceeded
        } else if err.status() == Some(StatusCode::UNAUTHORIZED) {
            Self::Unauthorized
        } else {
            Self::Http(err)
        }
    }
}
