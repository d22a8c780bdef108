//! Self-hosted model provider
//!
//! Talks to a lightweight `/generate` endpoint exposed by a self-hosted
//! completion server (API-key header, flat JSON request/response).

use crate::error::{Error, Result};
use crate::provider::{GenerateOptions, ModelProvider};
use crate::util::{classify_api_error, mask_key};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default request timeout for hosted endpoints
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Hosted provider configuration
#[derive(Clone)]
pub struct HostedConfig {
    /// Base URL of the generation server
    pub base_url: String,
    /// API key sent in the `X-API-Key` header
    pub api_key: String,
    /// Request timeout
    pub timeout: Duration,
}

impl fmt::Debug for HostedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostedConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &mask_key(&self.api_key))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HostedConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("HOSTED_MODEL_BASE_URL")
            .map_err(|_| Error::NotConfigured("HOSTED_MODEL_BASE_URL not set".to_string()))?;
        let api_key = std::env::var("HOSTED_MODEL_API_KEY")
            .map_err(|_| Error::NotConfigured("HOSTED_MODEL_API_KEY not set".to_string()))?;

        Ok(Self::new(base_url, api_key))
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct HostedRequest {
    prompt: String,
    max_tokens: u32,
    temperature: f32,
}

/// The server answers with `generated_text`; older deployments use `text`.
#[derive(Debug, Deserialize)]
struct HostedResponse {
    #[serde(default)]
    generated_text: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// Self-hosted model provider
pub struct HostedProvider {
    client: Client,
    config: HostedConfig,
}

impl HostedProvider {
    /// Create a new hosted provider
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: HostedConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(HostedConfig::from_env()?)
    }
}

#[async_trait::async_trait]
impl ModelProvider for HostedProvider {
    fn name(&self) -> &str {
        "hosted"
    }

    #[instrument(skip(self, prompt, options))]
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String> {
        let url = format!("{}/generate", self.config.base_url);

        let request = HostedRequest {
            prompt: options.compose_prompt(prompt),
            max_tokens: options.max_tokens_or_default(),
            temperature: options.temperature_or_default(),
        };

        debug!(url = %url, "sending request to hosted model");

        let response = self
            .client
            .post(&url)
            .header("X-API-Key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_api_error(status, &body));
        }

        let parsed: HostedResponse =
            serde_json::from_str(&body).map_err(|e| Error::InvalidResponse(e.to_string()))?;

        parsed
            .generated_text
            .or(parsed.text)
            .ok_or_else(|| Error::InvalidResponse("no text field in response".to_string()))
    }
}
