//! Error types for devswarm-agent

use thiserror::Error;

/// Agent error type
#[derive(Debug, Error)]
pub enum Error {
    /// Bus connect/publish/subscribe failure
    #[error("transport error: {0}")]
    Transport(String),

    /// No executor registered for a task type
    #[error("unknown task type: {0}")]
    UnknownTaskType(String),

    /// Executor failed while running a task
    #[error("executor error: {0}")]
    Executor(String),

    /// Unknown agent role name
    #[error("unknown role: {0}")]
    UnknownRole(String),

    /// Wire message could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
