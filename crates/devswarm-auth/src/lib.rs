//! devswarm Auth - client for the authentication worker
//!
//! The worker itself is an external collaborator; this crate only speaks its
//! contract: email/password registration and login, bearer-token issuance,
//! and the `/auth/me` usage report.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod types;

pub use client::AuthClient;
pub use error::{Error, Result};
pub use types::{LoginSession, UsageReport, UsageWindow, UserInfo, UserProfile, UserSummary};
