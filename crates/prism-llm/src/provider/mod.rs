//! Provider adapters for LLM backends
//!
//! Each adapter translates the canonical schema to one backend's native
//! wire format, decodes its SSE streaming, probes its availability, and
//! maps its failures into the shared error taxonomy.

pub mod anthropic;
pub mod azure;
pub mod cohere;
pub mod huggingface;
pub mod openai;

use std::pin::Pin;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use prism_config::ProviderConfig;
use prism_core::RequestContext;
use prism_monitor::ProbeOutcome;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{GatewayError, map_upstream_status};
use crate::types::{CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse};

/// Lazy finite sequence of canonical chunk responses
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<CompletionResponse, GatewayError>> + Send>>;

/// Capabilities advertised by a provider adapter
#[derive(Debug, Clone, Copy)]
pub struct ProviderCapabilities {
    /// Chat completions
    pub completions: bool,
    /// Embedding generation
    pub embeddings: bool,
    /// Server-sent-event streaming
    pub streaming: bool,
    /// Tool/function calling
    pub tool_calling: bool,
}

/// Contract each backend client presents to the core
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider name (key in the providers table)
    fn name(&self) -> &str;

    /// Advertised capabilities
    fn capabilities(&self) -> ProviderCapabilities;

    /// Send a non-streaming completion request
    async fn create_completion(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<CompletionResponse, GatewayError>;

    /// Send a streaming completion request
    ///
    /// Cancelling the request context terminates the upstream connection
    /// within one read boundary.
    async fn create_completion_stream(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<CompletionStream, GatewayError>;

    /// Generate embeddings
    async fn create_embedding(
        &self,
        request: &EmbeddingRequest,
        context: &RequestContext,
    ) -> Result<EmbeddingResponse, GatewayError>;

    /// List the provider's available model identifiers
    async fn list_models(&self) -> Result<Vec<String>, GatewayError>;

    /// Issue one cheap authenticated request and record its latency
    async fn is_available(&self) -> ProbeOutcome;
}

/// Build the per-provider HTTP client
///
/// One logical client per provider; reqwest pools connections behind
/// each clone.
pub(crate) fn build_client(config: &ProviderConfig) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_seconds))
        .build()
        .map_err(|e| GatewayError::Internal(anyhow::anyhow!("failed to build HTTP client: {e}")))
}

/// Resolve the API key for a request
///
/// A client-forwarded key wins when the provider allows forwarding;
/// otherwise the configured key is used.
pub(crate) fn resolve_api_key(
    configured: Option<&SecretString>,
    forward_authorization: bool,
    context: &RequestContext,
) -> Option<String> {
    if forward_authorization
        && let Some(key) = &context.api_key
    {
        return Some(key.expose_secret().to_owned());
    }
    configured.map(|k| k.expose_secret().to_owned())
}

/// Send a request, racing it against the caller's cancellation signal
pub(crate) async fn send_cancellable(
    provider: &str,
    builder: reqwest::RequestBuilder,
    context: &RequestContext,
) -> Result<reqwest::Response, GatewayError> {
    tokio::select! {
        result = builder.send() => result.map_err(|e| {
            tracing::error!(provider, error = %e, "upstream request failed");
            GatewayError::ProviderUnavailable {
                provider: provider.to_owned(),
                message: e.to_string(),
            }
        }),
        () = context.cancel.cancelled() => Err(GatewayError::ProviderUnavailable {
            provider: provider.to_owned(),
            message: "request cancelled".to_owned(),
        }),
    }
}

/// Turn a non-2xx response into a typed error, reading the body
pub(crate) async fn error_from_response(
    provider: &str,
    response: reqwest::Response,
    requested_model: Option<&str>,
) -> GatewayError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(http::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok());
    let body = response.text().await.unwrap_or_default();

    tracing::warn!(provider, %status, "upstream returned error");

    let mut error = map_upstream_status(provider, status, &body, requested_model);
    if let GatewayError::RateLimitExceeded { retry_after: slot, .. } = &mut error {
        *slot = retry_after;
    }
    error
}

/// Send a probe request and measure its round trip
pub(crate) async fn probe_request(builder: reqwest::RequestBuilder) -> ProbeOutcome {
    let start = Instant::now();
    match builder.send().await {
        Ok(response) if response.status().is_success() => ProbeOutcome {
            available: true,
            latency: start.elapsed(),
            error: None,
        },
        Ok(response) => ProbeOutcome {
            available: false,
            latency: start.elapsed(),
            error: Some(format!("probe returned {}", response.status())),
        },
        Err(e) => ProbeOutcome {
            available: false,
            latency: start.elapsed(),
            error: Some(e.to_string()),
        },
    }
}

/// What to do with one decoded SSE data payload
pub(crate) enum SseAction {
    /// Yield a canonical chunk
    Emit(CompletionResponse),
    /// Ignore this event (blank line, unknown type, malformed JSON)
    Skip,
    /// The stream is complete
    Done,
}

/// Decode an SSE response body into a canonical chunk stream
///
/// `convert` interprets each non-empty `data:` payload. Chunks are
/// yielded in arrival order; malformed payloads are skipped, never
/// aborting the stream. Cancellation ends the stream and drops the
/// upstream connection at the next read boundary.
pub(crate) fn sse_to_canonical<F>(
    provider: String,
    response: reqwest::Response,
    context: &RequestContext,
    mut convert: F,
) -> CompletionStream
where
    F: FnMut(&str) -> SseAction + Send + 'static,
{
    let error_provider = provider.clone();

    let stream = response
        .bytes_stream()
        .eventsource()
        .scan(false, move |finished, result| {
            if *finished {
                return futures_util::future::ready(None);
            }

            let item = match result {
                Ok(event) => {
                    let data = event.data.trim().to_owned();
                    if data.is_empty() {
                        None
                    } else {
                        match convert(&data) {
                            SseAction::Emit(mut chunk) => {
                                chunk.provider.clone_from(&provider);
                                Some(Ok(chunk))
                            }
                            SseAction::Skip => None,
                            SseAction::Done => {
                                *finished = true;
                                None
                            }
                        }
                    }
                }
                Err(e) => Some(Err(GatewayError::ProviderUnavailable {
                    provider: error_provider.clone(),
                    message: format!("stream error: {e}"),
                })),
            };

            if *finished {
                futures_util::future::ready(None)
            } else {
                futures_util::future::ready(Some(item))
            }
        })
        .filter_map(futures_util::future::ready)
        .take_until(context.cancel.clone().cancelled_owned());

    Box::pin(stream)
}
