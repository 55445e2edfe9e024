//! Gateway state: adapters, routing tables, monitors, and entry points
//!
//! Built once from configuration. The model registry is published as an
//! epoch behind an atomic swap; discovery refreshes and configuration
//! reloads replace the whole epoch rather than mutating it.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use prism_config::{GatewayConfig, ProviderType};
use prism_core::{
    AlertSink, ContentFilter, ContentVerdict, PersistenceSink, RequestContext, TokenUsageRecord, TracingAlertSink,
};
use prism_monitor::{HealthMonitor, HealthProbe, PerformanceMonitor, ProbeOutcome};
use prism_routing::{ModelInfo, ModelRegistry, RouteQuery, RouterContext, RoutingResult, SmartRouter};

use crate::error::GatewayError;
use crate::fallback::FallbackExecutor;
use crate::provider::{
    CompletionStream, ProviderAdapter, anthropic::AnthropicProvider, azure::AzureOpenAiProvider,
    cohere::CohereProvider, huggingface::HuggingFaceProvider, openai::OpenAiProvider,
};
use crate::types::{CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse};

/// Shared gateway state, cheap to clone
#[derive(Clone)]
pub struct GatewayState {
    inner: Arc<GatewayStateInner>,
}

struct GatewayStateInner {
    config: GatewayConfig,
    providers: HashMap<String, Arc<dyn ProviderAdapter>>,
    registry: ArcSwap<ModelRegistry>,
    router: SmartRouter,
    executor: FallbackExecutor,
    performance: Arc<PerformanceMonitor>,
    health: Arc<HealthMonitor>,
    persistence: Option<Arc<dyn PersistenceSink>>,
    content_filter: Option<Arc<dyn ContentFilter>>,
}

/// Adapt a provider's availability probe to the health monitor
struct AdapterProbe(Arc<dyn ProviderAdapter>);

#[async_trait]
impl HealthProbe for AdapterProbe {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn probe(&self) -> ProbeOutcome {
        self.0.is_available().await
    }
}

impl GatewayState {
    /// Build state from configuration with a tracing-backed alert sink
    pub fn from_config(config: GatewayConfig) -> Result<Self, GatewayError> {
        Self::with_collaborators(config, Some(Arc::new(TracingAlertSink)), None, None)
    }

    /// Build state with explicit collaborator implementations
    pub fn with_collaborators(
        config: GatewayConfig,
        alerts: Option<Arc<dyn AlertSink>>,
        persistence: Option<Arc<dyn PersistenceSink>>,
        content_filter: Option<Arc<dyn ContentFilter>>,
    ) -> Result<Self, GatewayError> {
        let mut providers: HashMap<String, Arc<dyn ProviderAdapter>> = HashMap::new();

        for (name, provider_config) in &config.providers {
            let adapter: Arc<dyn ProviderAdapter> = match provider_config.provider_type {
                ProviderType::Openai => Arc::new(OpenAiProvider::new(name.clone(), provider_config)?),
                ProviderType::AzureOpenai => Arc::new(AzureOpenAiProvider::new(name.clone(), provider_config)?),
                ProviderType::Anthropic => Arc::new(AnthropicProvider::new(name.clone(), provider_config)?),
                ProviderType::Cohere => Arc::new(CohereProvider::new(name.clone(), provider_config)?),
                ProviderType::Huggingface => Arc::new(HuggingFaceProvider::new(name.clone(), provider_config)?),
            };
            providers.insert(name.clone(), adapter);
        }

        let alerts = if config.alerts.enabled { alerts } else { None };

        let performance = Arc::new(PerformanceMonitor::new(config.performance.clone(), alerts.clone()));

        let probes: Vec<Arc<dyn HealthProbe>> = providers
            .values()
            .map(|adapter| Arc::new(AdapterProbe(Arc::clone(adapter))) as Arc<dyn HealthProbe>)
            .collect();
        let health = Arc::new(HealthMonitor::new(
            probes,
            config.health.clone(),
            alerts,
            persistence.clone(),
        ));

        let registry = ArcSwap::from_pointee(ModelRegistry::build(
            &config.providers,
            &HashMap::new(),
            &config.registry.models,
        ));

        let executor = FallbackExecutor::new(
            providers.clone(),
            config.fallback.clone(),
            Arc::clone(&performance),
            Some(Arc::clone(&health)),
        );

        Ok(Self {
            inner: Arc::new(GatewayStateInner {
                config,
                providers,
                registry,
                router: SmartRouter::new(),
                executor,
                performance,
                health,
                persistence,
                content_filter,
            }),
        })
    }

    /// Start the health-probe loop and background model discovery
    pub fn start_background(&self) {
        self.inner.health.start();
        crate::discovery::start_discovery(self.clone());
    }

    /// Stop background work; takes effect within one probe interval
    pub fn shutdown(&self) {
        self.inner.health.stop();
    }

    /// Execute a non-streaming completion
    pub async fn complete(
        &self,
        request: CompletionRequest,
        mut context: RequestContext,
    ) -> Result<CompletionResponse, GatewayError> {
        request.validate()?;
        if context.user.is_none() {
            context.user.clone_from(&request.user);
        }

        self.filter_content(&request).await?;

        let registry = self.inner.registry.load_full();
        let query = build_query(&request);
        let route = self.route_completion(&query, &registry)?;

        let response = self
            .inner
            .executor
            .execute(&request, route, |model| self.reroute(&query, model, &registry), &context)
            .await?;

        self.record_usage(&response, &context).await;
        Ok(response)
    }

    /// Execute a streaming completion
    ///
    /// Returns the winning route alongside the chunk stream; failover is
    /// only possible until the upstream stream is established.
    pub async fn complete_stream(
        &self,
        request: CompletionRequest,
        mut context: RequestContext,
    ) -> Result<(RoutingResult, CompletionStream), GatewayError> {
        request.validate()?;
        if context.user.is_none() {
            context.user.clone_from(&request.user);
        }

        self.filter_content(&request).await?;

        let registry = self.inner.registry.load_full();
        let query = build_query(&request);
        let route = self.route_completion(&query, &registry)?;

        self.inner
            .executor
            .execute_stream(&request, route, |model| self.reroute(&query, model, &registry), &context)
            .await
    }

    /// Generate embeddings
    ///
    /// Embedding requests skip the content/cost/latency strategies:
    /// direct mapping or registry lookup only, with a capability check on
    /// the selected model.
    pub async fn embed(
        &self,
        request: EmbeddingRequest,
        context: RequestContext,
    ) -> Result<EmbeddingResponse, GatewayError> {
        if request.model.is_empty() {
            return Err(GatewayError::Validation("model must not be empty".to_owned()));
        }
        if request.input.is_empty() {
            return Err(GatewayError::Validation("input must not be empty".to_owned()));
        }

        let registry = self.inner.registry.load_full();
        let route = self
            .inner
            .router
            .route_embedding(&request.model, request.user.as_deref(), &self.router_context(&registry));

        if !route.success {
            return Err(GatewayError::ModelNotFound {
                model: request.model.clone(),
            });
        }

        if let Some(info) = registry.get_model(&route.model_id)
            && !info.capabilities.embeddings
        {
            return Err(GatewayError::CapabilityNotSupported {
                provider: route.provider.clone(),
                capability: "embeddings".to_owned(),
            });
        }

        let provider = self
            .inner
            .providers
            .get(&route.provider)
            .ok_or_else(|| GatewayError::ProviderNotFound {
                provider: route.provider.clone(),
            })?;

        if !provider.capabilities().embeddings {
            return Err(GatewayError::CapabilityNotSupported {
                provider: route.provider.clone(),
                capability: "embeddings".to_owned(),
            });
        }

        let mut provider_request = request.clone();
        provider_request.model.clone_from(&route.provider_model_id);

        let mut response = provider.create_embedding(&provider_request, &context).await?;
        response.model.clone_from(&route.model_id);
        Ok(response)
    }

    /// All models known to the current registry epoch
    pub fn list_models(&self) -> Vec<ModelInfo> {
        self.inner.registry.load().list_models().cloned().collect()
    }

    /// Current registry epoch
    pub fn registry(&self) -> Arc<ModelRegistry> {
        self.inner.registry.load_full()
    }

    /// Live performance monitor
    pub fn performance(&self) -> &PerformanceMonitor {
        &self.inner.performance
    }

    /// Live health monitor
    pub fn health(&self) -> &HealthMonitor {
        &self.inner.health
    }

    /// Rebuild and atomically publish a new registry epoch
    pub fn rebuild_registry(&self, discovered: &HashMap<String, Vec<String>>) {
        let registry = ModelRegistry::build(
            &self.inner.config.providers,
            discovered,
            &self.inner.config.registry.models,
        );
        tracing::debug!(models = registry.len(), "publishing new registry epoch");
        self.inner.registry.store(Arc::new(registry));
    }

    pub(crate) fn providers(&self) -> &HashMap<String, Arc<dyn ProviderAdapter>> {
        &self.inner.providers
    }

    fn router_context<'a>(&'a self, registry: &'a ModelRegistry) -> RouterContext<'a> {
        RouterContext {
            registry,
            options: &self.inner.config.routing,
            performance: Some(&self.inner.performance),
            health: Some(&self.inner.health),
        }
    }

    fn route_completion(&self, query: &RouteQuery, registry: &ModelRegistry) -> Result<RoutingResult, GatewayError> {
        let route = self.inner.router.route(query, &self.router_context(registry));
        if route.success {
            tracing::info!(
                provider = %route.provider,
                model = %route.model_id,
                strategy = route.strategy,
                reason = %route.reason,
                "request routed"
            );
            Ok(route)
        } else {
            Err(GatewayError::Routing(
                route.error_message.unwrap_or_else(|| "no route selected".to_owned()),
            ))
        }
    }

    /// Re-resolve a fallback substitute through the router
    ///
    /// The substitute query drops the user identity so a per-user model
    /// preference cannot route the chain back onto the failing model.
    fn reroute(&self, query: &RouteQuery, model: &str, registry: &ModelRegistry) -> RoutingResult {
        let mut substitute = query.with_model(model);
        substitute.user = None;
        self.inner.router.route(&substitute, &self.router_context(registry))
    }

    async fn filter_content(&self, request: &CompletionRequest) -> Result<(), GatewayError> {
        let Some(filter) = &self.inner.content_filter else {
            return Ok(());
        };

        match filter.allow(&request.user_text()).await {
            ContentVerdict::Allow => Ok(()),
            ContentVerdict::Deny { reason, categories } => {
                tracing::warn!(%reason, ?categories, "content filter denied request");
                Err(GatewayError::ContentFiltered { reason })
            }
        }
    }

    /// Best-effort request log and token usage records; never fails the request
    async fn record_usage(&self, response: &CompletionResponse, context: &RequestContext) {
        let Some(persistence) = &self.inner.persistence else {
            return;
        };

        persistence
            .append_request_log(serde_json::json!({
                "correlationId": context.correlation_id,
                "provider": response.provider,
                "model": response.model,
                "responseId": response.id,
            }))
            .await;

        let Some(usage) = &response.usage else {
            return;
        };

        persistence
            .append_token_usage(TokenUsageRecord {
                correlation_id: context.correlation_id.clone(),
                provider: response.provider.clone(),
                model: response.model.clone(),
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                user: context.user.clone(),
            })
            .await;
    }
}

/// Distill a completion request into its routing-relevant view
fn build_query(request: &CompletionRequest) -> RouteQuery {
    RouteQuery {
        model: request.model.clone(),
        user: request.user.clone(),
        message_count: request.messages.len(),
        total_chars: request.total_content_chars(),
        user_text: request.user_text(),
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    }
}

#[cfg(test)]
mod tests {
    use prism_core::ContentFilter;

    use super::*;
    use crate::types::{Message, Role};

    fn config() -> GatewayConfig {
        toml::from_str(
            r#"
            [providers.openai]
            type = "openai"
            api_key = "sk-test"

            [providers.anthropic]
            type = "anthropic"
            api_key = "sk-ant-test"
            "#,
        )
        .unwrap()
    }

    fn request(model: &str) -> CompletionRequest {
        CompletionRequest {
            model: model.to_owned(),
            messages: vec![Message::text(Role::User, "hi")],
            max_tokens: None,
            temperature: None,
            top_p: None,
            stop: None,
            stream: false,
            tools: None,
            tool_choice: None,
            user: None,
        }
    }

    #[tokio::test]
    async fn unroutable_model_fails_with_routing_error() {
        let state = GatewayState::from_config(config()).unwrap();
        let err = state
            .complete(request("no-such-model"), RequestContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Routing(_)));
    }

    #[tokio::test]
    async fn invalid_request_fails_validation_before_routing() {
        let state = GatewayState::from_config(config()).unwrap();
        let mut req = request("openai.gpt-4");
        req.messages.clear();
        let err = state.complete(req, RequestContext::new()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }

    #[tokio::test]
    async fn embedding_on_anthropic_model_is_a_capability_error() {
        let state = GatewayState::from_config(config()).unwrap();
        let err = state
            .embed(
                EmbeddingRequest {
                    model: "anthropic.claude-3-opus".to_owned(),
                    input: crate::types::EmbedInput::Single("text".to_owned()),
                    user: None,
                },
                RequestContext::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::CapabilityNotSupported { .. }));
    }

    #[tokio::test]
    async fn embedding_on_unknown_model_is_model_not_found() {
        let state = GatewayState::from_config(config()).unwrap();
        let err = state
            .embed(
                EmbeddingRequest {
                    model: "mystery-embedder".to_owned(),
                    input: crate::types::EmbedInput::Single("text".to_owned()),
                    user: None,
                },
                RequestContext::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ModelNotFound { .. }));
    }

    struct DenyEverything;

    #[async_trait]
    impl ContentFilter for DenyEverything {
        async fn allow(&self, _body: &str) -> ContentVerdict {
            ContentVerdict::Deny {
                reason: "policy".to_owned(),
                categories: vec!["test".to_owned()],
            }
        }
    }

    #[tokio::test]
    async fn content_filter_denial_maps_to_content_filtered() {
        let state =
            GatewayState::with_collaborators(config(), None, None, Some(Arc::new(DenyEverything))).unwrap();
        let err = state
            .complete(request("openai.gpt-4"), RequestContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ContentFiltered { .. }));
        assert_eq!(err.code(), "content_filtered");
    }

    #[tokio::test]
    async fn registry_epoch_swaps_atomically() {
        let state = GatewayState::from_config(config()).unwrap();
        let before = state.registry();
        assert!(before.get_model("openai.gpt-4o-mini").is_none());

        let mut discovered = HashMap::new();
        discovered.insert("openai".to_owned(), vec!["gpt-4o-mini".to_owned()]);
        state.rebuild_registry(&discovered);

        // The old epoch is untouched; the new one carries the discovery
        assert!(before.get_model("openai.gpt-4o-mini").is_none());
        assert!(state.registry().get_model("openai.gpt-4o-mini").is_some());
    }
}
