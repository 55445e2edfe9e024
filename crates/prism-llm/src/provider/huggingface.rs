//! Hugging Face provider adapter
//!
//! Chat goes through the OpenAI-compatible inference router; embeddings
//! use the feature-extraction pipeline, which returns raw vector arrays.

use async_trait::async_trait;
use prism_config::ProviderConfig;
use prism_core::RequestContext;
use prism_monitor::ProbeOutcome;
use secrecy::SecretString;
use serde::Serialize;
use url::Url;

use super::openai::openai_sse_action;
use super::{
    CompletionStream, ProviderAdapter, ProviderCapabilities, build_client, error_from_response, probe_request,
    resolve_api_key, send_cancellable, sse_to_canonical,
};
use crate::error::GatewayError;
use crate::protocol::openai::{OpenAiRequest, OpenAiResponse};
use crate::types::{
    CompletionRequest, CompletionResponse, EmbeddingData, EmbeddingRequest, EmbeddingResponse, EmbeddingUsage,
};

/// Default OpenAI-compatible chat router base URL
const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/v1";

/// Base URL for the feature-extraction pipeline
const PIPELINE_BASE_URL: &str = "https://router.huggingface.co/hf-inference/models";

/// Feature-extraction request body
#[derive(Debug, Serialize)]
struct FeatureExtractionRequest {
    inputs: Vec<String>,
}

/// Hugging Face inference provider
pub struct HuggingFaceProvider {
    name: String,
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<SecretString>,
    forward_authorization: bool,
}

impl HuggingFaceProvider {
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

    fn chat_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/chat/completions")
    }

    fn embeddings_url(&self, model: &str) -> String {
        format!("{PIPELINE_BASE_URL}/{model}/pipeline/feature-extraction")
    }

    fn authorized(&self, builder: reqwest::RequestBuilder, context: &RequestContext) -> reqwest::RequestBuilder {
        match resolve_api_key(self.api_key.as_ref(), self.forward_authorization, context) {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl ProviderAdapter for HuggingFaceProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            completions: true,
            embeddings: true,
            streaming: true,
            tool_calling: false,
        }
    }

    async fn create_completion(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<CompletionResponse, GatewayError> {
        let wire_request: OpenAiRequest = request.into();

        let builder = self.authorized(self.client.post(self.chat_url()), context).json(&wire_request);

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

        let builder = self.authorized(self.client.post(self.chat_url()), context).json(&wire_request);

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
        let inputs: Vec<String> = request.input.as_vec().into_iter().map(ToOwned::to_owned).collect();
        let expected = inputs.len();
        // Rough accounting only; the pipeline reports no usage
        let prompt_tokens = u32::try_from(inputs.iter().map(String::len).sum::<usize>() / 4).unwrap_or(u32::MAX);

        let builder = self
            .authorized(self.client.post(self.embeddings_url(&request.model)), context)
            .json(&FeatureExtractionRequest { inputs });

        let response = send_cancellable(&self.name, builder, context).await?;
        if !response.status().is_success() {
            return Err(error_from_response(&self.name, response, Some(&request.model)).await);
        }

        let vectors: Vec<Vec<f32>> = response.json().await.map_err(|e| GatewayError::Provider {
            provider: self.name.clone(),
            code: None,
            message: format!("failed to parse feature-extraction response: {e}"),
        })?;

        if vectors.len() != expected {
            return Err(GatewayError::Provider {
                provider: self.name.clone(),
                code: None,
                message: format!("expected {expected} embeddings, received {}", vectors.len()),
            });
        }

        Ok(EmbeddingResponse {
            object: "list".to_owned(),
            data: vectors
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
        // The hub hosts hundreds of thousands of models; dynamic listing
        // is intentionally skipped and the catalogue governs
        Ok(Vec::new())
    }

    async fn is_available(&self) -> ProbeOutcome {
        let context = RequestContext::new();
        probe_request(self.authorized(self.client.get(self.chat_url().replace("/chat/completions", "/models")), &context))
            .await
    }
}
