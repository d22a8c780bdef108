//! Dual-model coding agent
//!
//! A primary model drafts code; an optional secondary model reviews and
//! improves the draft before it is returned.

use crate::error::Result;
use crate::provider::{GenerateOptions, ModelProvider};
use std::sync::Arc;
use tracing::{debug, info};

const CODE_SYSTEM_PROMPT: &str = "You are an expert software engineer. Generate clean, \
production-ready code with proper error handling and documentation. Focus on best \
practices and maintainability.";

const REVIEW_SYSTEM_PROMPT: &str = "You are a senior code reviewer. Improve the code \
quality, fix any bugs, and enhance best practices.";

const CHAT_SYSTEM_PROMPT: &str = "You are an autonomous CTO assistant. Help with coding, \
architecture, and development tasks.";

/// Coding agent over a primary and optional secondary (review) model.
pub struct CoderAgent {
    primary: Arc<dyn ModelProvider>,
    secondary: Option<Arc<dyn ModelProvider>>,
}

impl CoderAgent {
    /// Create an agent with a primary model only.
    #[must_use]
    pub fn new(primary: Arc<dyn ModelProvider>) -> Self {
        Self {
            primary,
            secondary: None,
        }
    }

    /// Add a secondary model used to review the primary's output.
    #[must_use]
    pub fn with_secondary(mut self, secondary: Arc<dyn ModelProvider>) -> Self {
        self.secondary = Some(secondary);
        self
    }

    /// Generate code for a request, cross-checking with the secondary model
    /// when one is configured.
    pub async fn generate_code(&self, prompt: &str) -> Result<String> {
        debug!(provider = %self.primary.name(), "primary model generating");

        let options = GenerateOptions::new()
            .with_system_prompt(CODE_SYSTEM_PROMPT)
            .with_temperature(0.7);
        let draft = self.primary.generate(prompt, &options).await?;

        let Some(reviewer) = &self.secondary else {
            return Ok(draft);
        };

        info!(provider = %reviewer.name(), "secondary model reviewing");

        let review_prompt = format!(
            "Review and improve this code:\n\n{draft}\n\nOriginal request: {prompt}\n\n\
             Provide the improved version with any fixes or enhancements."
        );
        let review_options = GenerateOptions::new()
            .with_system_prompt(REVIEW_SYSTEM_PROMPT)
            .with_temperature(0.6);

        reviewer.generate(&review_prompt, &review_options).await
    }

    /// Conversational request against the primary model.
    pub async fn chat(&self, prompt: &str) -> Result<String> {
        let options = GenerateOptions::new()
            .with_system_prompt(CHAT_SYSTEM_PROMPT)
            .with_temperature(0.8);
        self.primary.generate(prompt, &options).await
    }
}
