//! Request-processing core of the Prism gateway
//!
//! Provides a provider-agnostic completions and embeddings API over
//! heterogeneous LLM backends (`OpenAI`, Azure `OpenAI`, Anthropic, Cohere,
//! Hugging Face), with smart model routing, fallback chains, streaming,
//! and health/performance monitoring.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod convert;
pub mod discovery;
pub mod error;
pub mod fallback;
#[cfg(feature = "http")]
pub mod handler;
pub mod protocol;
pub mod provider;
pub mod state;
pub mod types;

pub use error::GatewayError;
pub use fallback::FallbackExecutor;
#[cfg(feature = "http")]
pub use handler::gateway_router;
pub use provider::{CompletionStream, ProviderAdapter, ProviderCapabilities};
pub use state::GatewayState;
pub use types::{CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse};
