//! Cohere provider adapter (v2 chat and embed APIs)

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
use crate::convert::cohere::CohereStreamState;
use crate::error::GatewayError;
use crate::protocol::cohere::{
    CohereEmbedRequest, CohereEmbedResponse, CohereModelList, CohereRequest, CohereResponse, CohereStreamEvent,
};
use crate::types::{
    CompletionRequest, CompletionResponse, EmbeddingData, EmbeddingRequest, EmbeddingResponse, EmbeddingUsage,
};

/// Default Cohere v2 API base URL
const DEFAULT_BASE_URL: &str = "https://api.cohere.com/v2";

/// Cohere provider
pub struct CohereProvider {
    name: String,
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<SecretString>,
    forward_authorization: bool,
}

impl CohereProvider {
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
impl ProviderAdapter for CohereProvider {
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
        let wire_request: CohereRequest = request.into();

        let builder = self.authorized(self.client.post(self.url("chat")), context).json(&wire_request);

        let response = send_cancellable(&self.name, builder, context).await?;
        if !response.status().is_success() {
            return Err(error_from_response(&self.name, response, Some(&request.model)).await);
        }

        let wire_response: CohereResponse = response.json().await.map_err(|e| GatewayError::Provider {
            provider: self.name.clone(),
            code: None,
            message: format!("failed to parse response: {e}"),
        })?;

        let mut canonical: CompletionResponse = wire_response.into();
        canonical.model.clone_from(&request.model);
        canonical.provider.clone_from(&self.name);
        Ok(canonical)
    }

    async fn create_completion_stream(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<CompletionStream, GatewayError> {
        let mut wire_request: CohereRequest = request.into();
        wire_request.stream = Some(true);

        let builder = self.authorized(self.client.post(self.url("chat")), context).json(&wire_request);

        let response = send_cancellable(&self.name, builder, context).await?;
        if !response.status().is_success() {
            return Err(error_from_response(&self.name, response, Some(&request.model)).await);
        }

        let mut state = CohereStreamState::new(request.model.clone(), request.estimated_prompt_tokens());

        Ok(sse_to_canonical(self.name.clone(), response, context, move |data| {
            match serde_json::from_str::<CohereStreamEvent>(data) {
                // message-end produces the final usage chunk; the
                // connection closes right after, ending the stream
                Ok(event) => state.convert_event(event).map_or(SseAction::Skip, SseAction::Emit),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unparseable Cohere SSE event");
                    SseAction::Skip
                }
            }
        }))
    }

    async fn create_embedding(
        &self,
        request: &EmbeddingRequest,
        context: &RequestContext,
    ) -> Result<EmbeddingResponse, GatewayError> {
        let texts: Vec<String> = request.input.as_vec().into_iter().map(ToOwned::to_owned).collect();
        let expected = texts.len();

        let wire_request = CohereEmbedRequest {
            model: request.model.clone(),
            texts,
            input_type: "search_document".to_owned(),
            embedding_types: vec!["float".to_owned()],
        };

        let builder = self.authorized(self.client.post(self.url("embed")), context).json(&wire_request);

        let response = send_cancellable(&self.name, builder, context).await?;
        if !response.status().is_success() {
            return Err(error_from_response(&self.name, response, Some(&request.model)).await);
        }

        let wire_response: CohereEmbedResponse = response.json().await.map_err(|e| GatewayError::Provider {
            provider: self.name.clone(),
            code: None,
            message: format!("failed to parse embed response: {e}"),
        })?;

        if wire_response.embeddings.float.len() != expected {
            return Err(GatewayError::Provider {
                provider: self.name.clone(),
                code: None,
                message: format!(
                    "expected {expected} embeddings, received {}",
                    wire_response.embeddings.float.len()
                ),
            });
        }

        let prompt_tokens = wire_response
            .meta
            .and_then(|m| m.billed_units)
            .map_or(0, |b| b.input_tokens);

        Ok(EmbeddingResponse {
            object: "list".to_owned(),
            data: wire_response
                .embeddings
                .float
                .into_iter()
                .enumerate()
                .map(|(index, embedding)| EmbeddingData {
                    object: "embedding".to_owned(),
                    embedding,
                    index,
                })
                .collect(),
            model: request.model.clone(),
            provider: self.name.clone(),
            usage: EmbeddingUsage {
                prompt_tokens,
                total_tokens: prompt_tokens,
            },
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, GatewayError> {
        let context = RequestContext::new();
        // The models listing lives on the v1 surface
        let url = self.url("models").replace("/v2/", "/v1/");
        let builder = self.authorized(self.client.get(url), &context);

        let response = send_cancellable(&self.name, builder, &context).await?;
        if !response.status().is_success() {
            return Err(error_from_response(&self.name, response, None).await);
        }

        let list: CohereModelList = response.json().await.map_err(|e| GatewayError::Provider {
            provider: self.name.clone(),
            code: None,
            message: format!("failed to parse model list: {e}"),
        })?;

        Ok(list.models.into_iter().map(|m| m.name).collect())
    }

    async fn is_available(&self) -> ProbeOutcome {
        let context = RequestContext::new();
        let url = self.url("models").replace("/v2/", "/v1/");
        probe_request(self.authorized(self.client.get(url), &context)).await
    }
}
