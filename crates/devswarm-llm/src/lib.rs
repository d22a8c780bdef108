//! devswarm LLM - Model provider abstraction and failover routing
//!
//! This crate provides the text-generation layer for devswarm:
//! - Provider: `ModelProvider` trait and generation options
//! - Router: failover across an ordered provider list with health tracking
//! - Gemini: Google AI Studio provider
//! - Vertex: Google Vertex AI provider
//! - Hosted: self-hosted `/generate` endpoint provider
//! - Coder: dual-model generate-then-review agent

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod coder;
pub mod error;
pub mod gemini;
pub mod hosted;
pub mod mock;
pub mod provider;
pub mod router;
pub mod util;
pub mod vertex;

pub use coder::CoderAgent;
pub use error::{Error, Result};
pub use gemini::{GeminiConfig, GeminiProvider};
pub use hosted::{HostedConfig, HostedProvider};
pub use mock::MockProvider;
pub use provider::{
    GenerateOptions, ModelProvider, TextStream, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
pub use router::{
    FailoverRouter, ProviderHealth, DEPRIORITIZE_AFTER_FAILURES, DEPRIORITIZE_COOLDOWN,
};
pub use vertex::{VertexConfig, VertexProvider};
