//! Static mapping-table lookup
//!
//! The cheapest strategy and the first one the orchestrator tries: the
//! requested model id is looked up in the configured `model_mappings`
//! table and resolved without inspecting the request at all.

use prism_config::StrategyName;

use crate::analysis::RouteQuery;
use crate::router::RouterContext;
use crate::strategy::{RouteStrategy, RoutingResult};

pub struct DirectMappingRouter;

impl RouteStrategy for DirectMappingRouter {
    fn name(&self) -> StrategyName {
        StrategyName::DirectMapping
    }

    fn route(&self, query: &RouteQuery, ctx: &RouterContext<'_>) -> RoutingResult {
        let strategy = StrategyName::DirectMapping.as_str();

        let Some(mapping) = ctx.options.model_mappings.get(&query.model) else {
            return RoutingResult::rejected(strategy, format!("no mapping for model '{}'", query.model));
        };

        let reason = format!("static mapping for '{}'", query.model);

        // Prefer the registry row for the target so the canonical id is
        // consistent with every other strategy; mappings may also point
        // at deployments the registry has never heard of
        ctx.registry
            .find_by_target(&mapping.provider, &mapping.provider_model_id)
            .map_or_else(
                || RoutingResult {
                    provider: mapping.provider.clone(),
                    model_id: format!("{}.{}", mapping.provider, mapping.provider_model_id),
                    provider_model_id: mapping.provider_model_id.clone(),
                    strategy,
                    reason: reason.clone(),
                    success: true,
                    error_message: None,
                },
                |info| RoutingResult::selected(info, strategy, reason.clone()),
            )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use indexmap::IndexMap;
    use prism_config::{ModelMapping, ProviderType, RoutingOptions};

    use super::*;
    use crate::registry::ModelRegistry;
    use crate::registry::tests::provider_config;

    fn context_pieces() -> (ModelRegistry, RoutingOptions) {
        let mut providers = IndexMap::new();
        providers.insert("openai".to_owned(), provider_config(ProviderType::Openai));
        let registry = ModelRegistry::build(&providers, &HashMap::new(), &[]);

        let mut options = RoutingOptions::default();
        options.model_mappings.insert(
            "gpt-4".to_owned(),
            ModelMapping {
                provider: "openai".to_owned(),
                provider_model_id: "gpt-4".to_owned(),
            },
        );
        options.model_mappings.insert(
            "house-model".to_owned(),
            ModelMapping {
                provider: "openai".to_owned(),
                provider_model_id: "ft:gpt-3.5:acme-1".to_owned(),
            },
        );
        (registry, options)
    }

    fn query(model: &str) -> RouteQuery {
        RouteQuery {
            model: model.to_owned(),
            user: None,
            message_count: 1,
            total_chars: 10,
            user_text: String::new(),
            max_tokens: None,
            temperature: None,
        }
    }

    #[test]
    fn hit_resolves_to_registry_canonical_id() {
        let (registry, options) = context_pieces();
        let ctx = RouterContext {
            registry: &registry,
            options: &options,
            performance: None,
            health: None,
        };

        let result = DirectMappingRouter.route(&query("gpt-4"), &ctx);
        assert!(result.success);
        assert_eq!(result.strategy, "DirectMapping");
        assert_eq!(result.provider, "openai");
        assert_eq!(result.model_id, "openai.gpt-4");
        assert_eq!(result.provider_model_id, "gpt-4");
    }

    #[test]
    fn unmapped_model_is_rejected() {
        let (registry, options) = context_pieces();
        let ctx = RouterContext {
            registry: &registry,
            options: &options,
            performance: None,
            health: None,
        };

        let result = DirectMappingRouter.route(&query("mystery"), &ctx);
        assert!(!result.success);
    }

    #[test]
    fn mapping_to_unregistered_target_still_routes() {
        let (registry, options) = context_pieces();
        let ctx = RouterContext {
            registry: &registry,
            options: &options,
            performance: None,
            health: None,
        };

        let result = DirectMappingRouter.route(&query("house-model"), &ctx);
        assert!(result.success);
        assert_eq!(result.provider_model_id, "ft:gpt-3.5:acme-1");
        assert_eq!(result.model_id, "openai.ft:gpt-3.5:acme-1");
    }
}
