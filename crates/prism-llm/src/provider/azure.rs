//! Azure `OpenAI` provider adapter
//!
//! Speaks the `OpenAI` wire format against per-deployment endpoints:
//! `{base}/openai/deployments/{deployment}/{operation}?api-version=...`
//! with `api-key` header authentication. The canonical request's model id
//! is the deployment name.

use async_trait::async_trait;
use prism_config::ProviderConfig;
use prism_core::RequestContext;
use prism_monitor::ProbeOutcome;
use secrecy::SecretString;
use url::Url;

use super::openai::{embedding_response, openai_sse_action};
use super::{
    CompletionStream, ProviderAdapter, ProviderCapabilities, build_client, error_from_response, probe_request,
    resolve_api_key, send_cancellable, sse_to_canonical,
};
use crate::error::GatewayError;
use crate::protocol::openai::{
    OpenAiEmbeddingRequest, OpenAiEmbeddingResponse, OpenAiModelList, OpenAiRequest, OpenAiResponse,
};
use crate::types::{CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse};

/// Default Azure `OpenAI` API version query parameter
const DEFAULT_API_VERSION: &str = "2024-02-01";

/// Azure-hosted `OpenAI` provider
pub struct AzureOpenAiProvider {
    name: String,
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<SecretString>,
    api_version: String,
    forward_authorization: bool,
}

impl AzureOpenAiProvider {
    /// Create from provider configuration
    ///
    /// Azure endpoints are account-specific, so `base_url` is required.
    pub fn new(name: String, config: &ProviderConfig) -> Result<Self, GatewayError> {
        let base_url = config.base_url.clone().ok_or_else(|| {
            GatewayError::Internal(anyhow::anyhow!("azure provider '{name}' requires base_url"))
        })?;

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

    fn deployment_url(&self, deployment: &str, operation: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!(
            "{base}/openai/deployments/{deployment}/{operation}?api-version={}",
            self.api_version
        )
    }

    fn models_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/openai/models?api-version={}", self.api_version)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder, context: &RequestContext) -> reqwest::RequestBuilder {
        match resolve_api_key(self.api_key.as_ref(), self.forward_authorization, context) {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }
}

#[async_trait]
impl ProviderAdapter for AzureOpenAiProvider {
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
        let url = self.deployment_url(&request.model, "chat/completions");

        let builder = self.authorized(self.client.post(url), context).json(&wire_request);

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

        let url = self.deployment_url(&request.model, "chat/completions");
        let builder = self.authorized(self.client.post(url), context).json(&wire_request);

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

        let url = self.deployment_url(&request.model, "embeddings");
        let builder = self.authorized(self.client.post(url), context).json(&wire_request);

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
        let builder = self.authorized(self.client.get(self.models_url()), &context);

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
        probe_request(self.authorized(self.client.get(self.models_url()), &context)).await
    }
}
