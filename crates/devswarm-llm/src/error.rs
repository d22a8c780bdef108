//! Error types for devswarm-llm

use thiserror::Error;

/// Provider and router error type
#[derive(Debug, Error)]
pub enum Error {
    /// Provider not configured
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// API error
    #[error("api error: {0}")]
    Api(String),

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    RateLimit,

    /// Every configured provider failed for one generate call.
    ///
    /// Entries are `"name: message"` in attempt order.
    #[error("all providers failed: [{}]", .0.join("; "))]
    AllProvidersFailed(Vec<String>),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
