//! Google Vertex AI provider
//!
//! Uses the `streamGenerateContent` endpoint, which answers with a JSON array
//! of response chunks even for a single-shot call.

use crate::error::{Error, Result};
use crate::provider::{GenerateOptions, ModelProvider};
use crate::util::{classify_api_error, mask_key};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

/// Vertex AI base URL
pub const BASE_URL: &str = "https://aiplatform.googleapis.com/v1/publishers/google/models";

/// Default Vertex AI model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

/// Vertex AI provider configuration
#[derive(Clone)]
pub struct VertexConfig {
    /// API key
    pub api_key: String,
    /// Model name
    pub model: String,
    /// Base URL
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl fmt::Debug for VertexConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexConfig")
            .field("api_key", &mask_key(&self.api_key))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl VertexConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("VERTEX_AI_API_KEY")
            .map_err(|_| Error::NotConfigured("VERTEX_AI_API_KEY not set".to_string()))?;

        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var("VERTEX_AI_MODEL") {
            config.model = model;
        }
        Ok(config)
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct VertexRequest {
    contents: Vec<VertexContent>,
    #[serde(rename = "generationConfig")]
    generation_config: VertexGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct VertexContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<VertexPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct VertexPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct VertexGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct VertexChunk {
    #[serde(default)]
    candidates: Vec<VertexCandidate>,
}

#[derive(Debug, Deserialize)]
struct VertexCandidate {
    #[serde(default)]
    content: Option<VertexContent>,
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Google Vertex AI provider
pub struct VertexProvider {
    client: Client,
    config: VertexConfig,
}

impl VertexProvider {
    /// Create a new Vertex AI provider
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: VertexConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(VertexConfig::from_env()?)
    }

    /// Concatenate candidate part texts from the chunk array body.
    ///
    /// Bodies that are not a JSON array are returned verbatim.
    fn parse_chunked_response(body: &str) -> String {
        let Ok(chunks) = serde_json::from_str::<Vec<VertexChunk>>(body) else {
            return body.to_string();
        };

        let mut parts = String::new();
        for chunk in chunks {
            for candidate in chunk.candidates {
                let Some(content) = candidate.content else {
                    continue;
                };
                for part in content.parts {
                    if let Some(text) = part.text {
                        parts.push_str(&text);
                    }
                }
            }
        }
        parts
    }
}

#[async_trait::async_trait]
impl ModelProvider for VertexProvider {
    fn name(&self) -> &str {
        "vertex"
    }

    #[instrument(skip(self, prompt, options), fields(model = %self.config.model))]
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String> {
        let url = format!(
            "{}/{}:streamGenerateContent?key={}",
            self.config.base_url, self.config.model, self.config.api_key
        );

        let request = VertexRequest {
            contents: vec![VertexContent {
                role: Some("user".to_string()),
                parts: vec![VertexPart {
                    text: Some(options.compose_prompt(prompt)),
                }],
            }],
            generation_config: VertexGenerationConfig {
                temperature: options.temperature_or_default(),
                max_output_tokens: options.max_tokens_or_default(),
            },
        };

        debug!("sending request to Vertex AI");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_api_error(status, &text));
        }

        Ok(Self::parse_chunked_response(&text))
    }
}
