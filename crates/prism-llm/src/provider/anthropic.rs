//! Anthropic Messages API provider adapter
//!
//! Anthropic offers no embeddings endpoint and no list-models endpoint;
//! embeddings surface a capability error and the model list comes from
//! a static catalogue.

use async_trait::async_trait;
use prism_config::ProviderConfig;
use prism_core::RequestContext;
use prism_monitor::ProbeOutcome;
use secrecy::SecretString;
use url::Url;

use super::{
    CompletionStream, ProviderAdapter, ProviderCapabilities, SseAction, build_client, error_from_response,
    probe_request, resolve_api_key, send_cancellable, sse_to_canonical,
};
use crate::convert::anthropic::AnthropicStreamState;
use crate::error::GatewayError;
use crate::protocol::anthropic::{AnthropicRequest, AnthropicResponse, AnthropicStreamEvent};
use crate::types::{CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse};

/// Default Anthropic API base URL
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Default Anthropic API version header value
const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Models served by the Messages API; Anthropic has no list endpoint
const STATIC_MODELS: &[&str] = &[
    "claude-3-opus-20240229",
    "claude-3-5-sonnet-20241022",
    "claude-3-sonnet-20240229",
    "claude-3-haiku-20240307",
];

/// Anthropic Messages API provider
pub struct AnthropicProvider {
    name: String,
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<SecretString>,
    api_version: String,
    forward_authorization: bool,
}

impl AnthropicProvider {
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
            api_version: config
                .api_version
                .clone()
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_owned()),
            forward_authorization: config.forward_authorization,
        })
    }

    fn messages_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/messages")
    }

    fn authorized(&self, builder: reqwest::RequestBuilder, context: &RequestContext) -> reqwest::RequestBuilder {
        let builder = builder.header("anthropic-version", &self.api_version);
        match resolve_api_key(self.api_key.as_ref(), self.forward_authorization, context) {
            Some(key) => builder.header("x-api-key", key),
            None => builder,
        }
    }

    /// Minimal request used as an authenticated liveness probe
    fn probe_body(&self) -> serde_json::Value {
        serde_json::json!({
            "model": STATIC_MODELS[STATIC_MODELS.len() - 1],
            "max_tokens": 1,
            "messages": [{"role": "user", "content": "ping"}],
        })
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            completions: true,
            embeddings: false,
            streaming: true,
            tool_calling: true,
        }
    }

    async fn create_completion(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<CompletionResponse, GatewayError> {
        let wire_request = AnthropicRequest::try_from(request)?;

        let builder = self
            .authorized(self.client.post(self.messages_url()), context)
            .json(&wire_request);

        let response = send_cancellable(&self.name, builder, context).await?;
        if !response.status().is_success() {
            return Err(error_from_response(&self.name, response, Some(&request.model)).await);
        }

        let wire_response: AnthropicResponse = response.json().await.map_err(|e| GatewayError::Provider {
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
        let mut wire_request = AnthropicRequest::try_from(request)?;
        wire_request.stream = Some(true);

        let builder = self
            .authorized(self.client.post(self.messages_url()), context)
            .json(&wire_request);

        let response = send_cancellable(&self.name, builder, context).await?;
        if !response.status().is_success() {
            return Err(error_from_response(&self.name, response, Some(&request.model)).await);
        }

        // Prompt tokens arrive on message_start; the chars/4 estimate
        // covers streams that never report usage
        let mut state = AnthropicStreamState::new(request.model.clone(), request.estimated_prompt_tokens());

        Ok(sse_to_canonical(self.name.clone(), response, context, move |data| {
            match serde_json::from_str::<AnthropicStreamEvent>(data) {
                Ok(AnthropicStreamEvent::MessageStop) => SseAction::Done,
                Ok(event) => state.convert_event(event).map_or(SseAction::Skip, SseAction::Emit),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unparseable Anthropic SSE event");
                    SseAction::Skip
                }
            }
        }))
    }

    async fn create_embedding(
        &self,
        _request: &EmbeddingRequest,
        _context: &RequestContext,
    ) -> Result<EmbeddingResponse, GatewayError> {
        Err(GatewayError::CapabilityNotSupported {
            provider: self.name.clone(),
            capability: "embeddings".to_owned(),
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, GatewayError> {
        Ok(STATIC_MODELS.iter().map(|&m| m.to_owned()).collect())
    }

    async fn is_available(&self) -> ProbeOutcome {
        let context = RequestContext::new();
        let builder = self
            .authorized(self.client.post(self.messages_url()), &context)
            .json(&self.probe_body());
        probe_request(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> AnthropicProvider {
        let config: ProviderConfig = toml::from_str("type = \"anthropic\"\napi_key = \"sk-ant-test\"").unwrap();
        AnthropicProvider::new("anthropic".to_owned(), &config).unwrap()
    }

    #[tokio::test]
    async fn embeddings_are_not_supported() {
        let provider = provider();
        let request = EmbeddingRequest {
            model: "claude-3-opus-20240229".to_owned(),
            input: crate::types::EmbedInput::Single("text".to_owned()),
            user: None,
        };

        let err = provider
            .create_embedding(&request, &RequestContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::CapabilityNotSupported { .. }));
        assert_eq!(err.code(), "capability_not_supported");
    }

    #[tokio::test]
    async fn model_list_is_static() {
        let models = provider().list_models().await.unwrap();
        assert!(models.contains(&"claude-3-haiku-20240307".to_owned()));
    }
}
