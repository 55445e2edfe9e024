//! `OpenAI` provider adapter

use async_trait::async_trait;
use prism_config::ProviderConfig;
use prism_core::RequestContext;
use prism_monitor::ProbeOutcome;
use secrecy::SecretString;
use url::Url;

use super::{
    CompletionStream, ProviderAdapter, ProviderCapabilities, SseAction, build_client, error_from_response, probe_request,
    resolve_api_key, send_cancellable, sse_to_canonical,
};
use crate::convert;
use crate::error::GatewayError;
use crate::protocol::openai::{
    OpenAiEmbeddingRequest, OpenAiEmbeddingResponse, OpenAiModelList, OpenAiRequest, OpenAiResponse,
    OpenAiStreamChunk, OpenAiStreamOptions,
};
use crate::types::{
    CompletionRequest, CompletionResponse, EmbeddingData, EmbeddingRequest, EmbeddingResponse, EmbeddingUsage,
};

/// Default `OpenAI` API base URL
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Whether the base URL is the canonical `OpenAI` API (vs a compatible third party)
fn is_canonical_openai(base_url: &Url) -> bool {
    base_url.host_str().is_some_and(|h| h == "api.openai.com")
}

/// Interpret one OpenAI-format SSE payload
///
/// Shared with the Azure and Hugging Face adapters, which speak the same
/// streaming format.
pub(crate) fn openai_sse_action(data: &str) -> SseAction {
    if data == "[DONE]" {
        return SseAction::Done;
    }

    match serde_json::from_str::<OpenAiStreamChunk>(data) {
        Ok(chunk) => SseAction::Emit(convert::openai::chunk_to_response(chunk)),
        Err(e) => {
            tracing::debug!(error = %e, data, "skipping unparseable SSE chunk");
            SseAction::Skip
        }
    }
}

/// Project an `OpenAI` embeddings response into the canonical shape,
/// verifying the positional invariant
///
/// Shared with the Azure adapter.
pub(crate) fn embedding_response(
    provider: &str,
    wire: OpenAiEmbeddingResponse,
    expected: usize,
) -> Result<EmbeddingResponse, GatewayError> {
    if wire.data.len() != expected {
        return Err(GatewayError::Provider {
            provider: provider.to_owned(),
            code: None,
            message: format!("expected {expected} embeddings, received {}", wire.data.len()),
        });
    }

    Ok(EmbeddingResponse {
        object: wire.object,
        data: wire
            .data
            .into_iter()
            .map(|d| EmbeddingData {
                object: d.object,
                embedding: d.embedding,
                index: d.index,
            })
            .collect(),
        model: wire.model,
        provider: provider.to_owned(),
        usage: EmbeddingUsage {
            prompt_tokens: wire.usage.prompt_tokens,
            total_tokens: wire.usage.total_tokens,
        },
    })
}

/// `OpenAI` provider
pub struct OpenAiProvider {
    name: String,
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<SecretString>,
    forward_authorization: bool,
}

impl OpenAiProvider {
    /// Create from provider configuration
    pub fn new(name: String, config: &ProviderConfig) -> Result<Self, GatewayError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| Url::parse(DEFAULT_BASE_URL).expect("valid default URL"));

        Ok(Self {
            name,
            client: build_client(config)?,
            base_url,
            api_key: config.api_key.clone(),
            forward_authorization: config.forward_authorization,
        })
    }

    fn url(&self, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/{path}")
    }

    fn authorized(&self, builder: reqwest::RequestBuilder, context: &RequestContext) -> reqwest::RequestBuilder {
        match resolve_api_key(self.api_key.as_ref(), self.forward_authorization, context) {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            completions: true,
            embeddings: true,
            streaming: true,
            tool_calling: true,
        }
    }

    async fn create_completion(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<CompletionResponse, GatewayError> {
        let wire_request: OpenAiRequest = request.into();

        let builder = self
            .authorized(self.client.post(self.url("chat/completions")), context)
            .json(&wire_request);

        let response = send_cancellable(&self.name, builder, context).await?;
        if !response.status().is_success() {
            return Err(error_from_response(&self.name, response, Some(&request.model)).await);
        }

        let wire_response: OpenAiResponse = response.json().await.map_err(|e| GatewayError::Provider {
            provider: self.name.clone(),
            code: None,
            message: format!("failed to parse response: {e}"),
        })?;

        let mut canonical: CompletionResponse = wire_response.into();
        canonical.provider.clone_from(&self.name);
        Ok(canonical)
    }

    async fn create_completion_stream(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<CompletionStream, GatewayError> {
        let mut wire_request: OpenAiRequest = request.into();
        wire_request.stream = Some(true);

        // Only send stream_options to canonical OpenAI; many compatible
        // APIs reject the unsupported parameter
        wire_request.stream_options = is_canonical_openai(&self.base_url)
            .then_some(OpenAiStreamOptions { include_usage: true });

        let builder = self
            .authorized(self.client.post(self.url("chat/completions")), context)
            .json(&wire_request);

        let response = send_cancellable(&self.name, builder, context).await?;
        if !response.status().is_success() {
            return Err(error_from_response(&self.name, response, Some(&request.model)).await);
        }

        Ok(sse_to_canonical(self.name.clone(), response, context, openai_sse_action))
    }

    async fn create_embedding(
        &self,
        request: &EmbeddingRequest,
        context: &RequestContext,
    ) -> Result<EmbeddingResponse, GatewayError> {
        let wire_request = OpenAiEmbeddingRequest {
            input: request.input.as_vec().into_iter().map(ToOwned::to_owned).collect(),
            model: request.model.clone(),
            encoding_format: "float".to_owned(),
            user: request.user.clone(),
        };

        let builder = self
            .authorized(self.client.post(self.url("embeddings")), context)
            .json(&wire_request);

        let response = send_cancellable(&self.name, builder, context).await?;
        if !response.status().is_success() {
            return Err(error_from_response(&self.name, response, Some(&request.model)).await);
        }

        let wire_response: OpenAiEmbeddingResponse = response.json().await.map_err(|e| GatewayError::Provider {
            provider: self.name.clone(),
            code: None,
            message: format!("failed to parse embeddings response: {e}"),
        })?;

        embedding_response(&self.name, wire_response, request.input.len())
    }

    async fn list_models(&self) -> Result<Vec<String>, GatewayError> {
        let context = RequestContext::new();
        let builder = self.authorized(self.client.get(self.url("models")), &context);

        let response = send_cancellable(&self.name, builder, &context).await?;
        if !response.status().is_success() {
            return Err(error_from_response(&self.name, response, None).await);
        }

        let list: OpenAiModelList = response.json().await.map_err(|e| GatewayError::Provider {
            provider: self.name.clone(),
            code: None,
            message: format!("failed to parse model list: {e}"),
        })?;

        Ok(list.data.into_iter().map(|m| m.id).collect())
    }

    async fn is_available(&self) -> ProbeOutcome {
        let context = RequestContext::new();
        probe_request(self.authorized(self.client.get(self.url("models")), &context)).await
    }
}
