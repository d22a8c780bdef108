//! ModelProvider trait definition
//!
//! This module defines the capability every text-generation backend must
//! implement, along with the per-call generation options.

use crate::error::Result;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Default sampling temperature when none is requested
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default output token cap when none is requested
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Stream of generated text chunks
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Per-call generation options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Sampling randomness (provider default 0.7)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Output token cap (provider default 2048)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Instruction context prepended to the prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl GenerateOptions {
    /// Create empty options (provider defaults apply)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sampling temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the output token cap
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the system prompt
    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Temperature to send, falling back to the default
    #[must_use]
    pub fn temperature_or_default(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    /// Token cap to send, falling back to the default
    #[must_use]
    pub fn max_tokens_or_default(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    /// Prompt with the system prompt prepended, if one is set
    #[must_use]
    pub fn compose_prompt(&self, prompt: &str) -> String {
        match &self.system_prompt {
            Some(system) => format!("{system}\n\n{prompt}"),
            None => prompt.to_string(),
        }
    }
}

/// Trait for text-generation backends
///
/// Providers are stateless from the caller's perspective; any failure is a
/// provider-specific error the router may recover from by trying the next
/// backend.
#[async_trait::async_trait]
pub trait ModelProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Generate text for a prompt
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String>;

    /// Generate text as a stream of chunks
    ///
    /// The default implementation yields the full `generate` result as a
    /// single chunk; providers with native streaming may override it.
    async fn generate_stream(&self, prompt: &str, options: &GenerateOptions) -> Result<TextStream> {
        let text = self.generate(prompt, options).await?;
        Ok(Box::pin(futures::stream::once(async move { Ok(text) })))
    }
}
