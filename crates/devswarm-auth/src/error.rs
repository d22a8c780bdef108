//! Error types for devswarm-auth

use thiserror::Error;

/// Auth client error type
#[derive(Debug, Error)]
pub enum Error {
    /// The worker rejected the request (bad credentials, expired token,
    /// duplicate registration). Never retried silently.
    #[error("authentication failed ({status}): {message}")]
    AuthenticationFailed {
        /// HTTP status returned by the worker
        status: u16,
        /// The worker's error message
        message: String,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
