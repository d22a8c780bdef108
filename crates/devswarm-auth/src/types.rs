//! Wire types for the authentication worker contract

use serde::{Deserialize, Serialize};

/// User identity as returned by register/login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    /// User id
    pub id: String,
    /// Email address
    pub email: String,
    /// Subscription plan name
    pub plan: String,
}

/// Successful register/login response.
///
/// The token is an opaque string; `expires_at` is unix seconds and is
/// enforced by the worker, not the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginSession {
    /// Authenticated user
    pub user: UserSummary,
    /// Bearer token
    pub token: String,
    /// Token expiry, unix seconds
    pub expires_at: i64,
}

/// User identity with account metadata, as returned by `/auth/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// User id
    pub id: String,
    /// Email address
    pub email: String,
    /// Subscription plan name
    pub plan: String,
    /// Account creation time, unix seconds
    pub created_at: i64,
}

/// Requests/tokens counted over one window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UsageWindow {
    /// Request count
    pub requests: u64,
    /// Token count
    pub tokens: u64,
}

/// Today's usage against the plan's limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UsageReport {
    /// Usage so far today
    pub today: UsageWindow,
    /// Plan limits
    pub limits: UsageWindow,
}

/// Full `/auth/me` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    /// Authenticated user
    pub user: UserProfile,
    /// Usage against limits
    pub usage: UsageReport,
}
