//! Mock model provider for testing
//!
//! Returns scripted outcomes and records every prompt it receives, so router
//! tests can assert on attempt order.

use crate::error::{Error, Result};
use crate::provider::{GenerateOptions, ModelProvider};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A mock provider that replays scripted outcomes.
///
/// With an empty script it answers `"mock response"`, or a fixed error when
/// constructed with [`MockProvider::failing`].
pub struct MockProvider {
    name: String,
    fail_by_default: bool,
    script: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<String>>,
}

impl MockProvider {
    /// Create a mock that succeeds by default.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fail_by_default: false,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that fails by default.
    #[must_use]
    pub fn failing(name: impl Into<String>) -> Self {
        Self {
            fail_by_default: true,
            ..Self::new(name)
        }
    }

    /// Queue a successful response.
    pub fn push_response(&self, text: impl Into<String>) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Ok(text.into()));
    }

    /// Queue a failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(Error::Api(message.into())));
    }

    /// Prompts received so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait::async_trait]
impl ModelProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str, _options: &GenerateOptions) -> Result<String> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match scripted {
            Some(outcome) => outcome,
            None if self.fail_by_default => Err(Error::Api(format!("{} unavailable", self.name))),
            None => Ok("mock response".to_string()),
        }
    }
}
