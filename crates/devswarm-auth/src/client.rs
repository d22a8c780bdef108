//! HTTP client for the authentication worker

use crate::error::{Error, Result};
use crate::types::{LoginSession, UserInfo};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error body shape used by the worker.
#[derive(Debug, Deserialize)]
struct WorkerError {
    error: String,
}

/// Client for the external authentication worker.
///
/// Tokens are opaque; expiry is checked by the worker. Failures are never
/// retried here.
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
}

impl AuthClient {
    /// Create a client against a worker base URL.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| Error::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Register a new account and receive a session.
    ///
    /// The worker answers 400 on malformed input and 409 when the email is
    /// already registered.
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<LoginSession> {
        self.post_credentials("/auth/register", email, password)
            .await
    }

    /// Log in with email/password and receive a session.
    ///
    /// The worker answers 401 on bad credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession> {
        self.post_credentials("/auth/login", email, password).await
    }

    /// Fetch the current user and today's usage against plan limits.
    ///
    /// The worker answers 401 on a missing or expired token.
    #[instrument(skip(self, token))]
    pub async fn me(&self, token: &str) -> Result<UserInfo> {
        let response = self
            .client
            .get(format!("{}/auth/me", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        Self::decode(response).await
    }

    /// Invalidate a token.
    #[instrument(skip(self, token))]
    pub async fn logout(&self, token: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/auth/logout", self.base_url))
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::worker_error(status, &Self::body(response).await?))
        }
    }

    async fn post_credentials(
        &self,
        path: &str,
        email: &str,
        password: &str,
    ) -> Result<LoginSession> {
        debug!(path = %path, "sending credentials to auth worker");

        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(&json!({"email": email, "password": password}))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        Self::decode(response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let body = Self::body(response).await?;

        if !status.is_success() {
            return Err(Self::worker_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| Error::InvalidResponse(e.to_string()))
    }

    async fn body(response: Response) -> Result<String> {
        response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))
    }

    fn worker_error(status: StatusCode, body: &str) -> Error {
        let message = serde_json::from_str::<WorkerError>(body)
            .map(|e| e.error)
            .unwrap_or_else(|_| body.trim().to_string());
        Error::AuthenticationFailed {
            status: status.as_u16(),
            message,
        }
    }
}
