//! Load-balanced routing
//!
//! Uniform-random pick across the mapping table, after filtering out
//! targets below the context-window floor and providers the health
//! monitor currently reports unavailable. The RNG is process-local;
//! replicas are not coordinated.

use prism_config::StrategyName;
use rand::seq::IndexedRandom;

use crate::analysis::RouteQuery;
use crate::router::RouterContext;
use crate::strategy::{RouteStrategy, RoutingResult};

pub struct LoadBalanceRouter;

impl RouteStrategy for LoadBalanceRouter {
    fn name(&self) -> StrategyName {
        StrategyName::LoadBalanced
    }

    fn route(&self, _query: &RouteQuery, ctx: &RouterContext<'_>) -> RoutingResult {
        let strategy = StrategyName::LoadBalanced.as_str();

        if !ctx.options.enable_load_balancing {
            return RoutingResult::rejected(strategy, "load balancing disabled");
        }

        let candidates: Vec<RoutingResult> = ctx
            .options
            .model_mappings
            .values()
            .filter(|mapping| {
                ctx.health.is_none_or(|h| h.is_available(&mapping.provider))
            })
            .filter_map(|mapping| {
                let info = ctx.registry.find_by_target(&mapping.provider, &mapping.provider_model_id);
                match info {
                    Some(info) if info.context_window >= ctx.options.min_context_window => Some(
                        RoutingResult::selected(info, strategy, "uniform pick across mappings"),
                    ),
                    // Unregistered targets only qualify when no floor is set
                    None if ctx.options.min_context_window == 0 => Some(RoutingResult {
                        provider: mapping.provider.clone(),
                        model_id: format!("{}.{}", mapping.provider, mapping.provider_model_id),
                        provider_model_id: mapping.provider_model_id.clone(),
                        strategy,
                        reason: "uniform pick across mappings".to_owned(),
                        success: true,
                        error_message: None,
                    }),
                    _ => None,
                }
            })
            .collect();

        candidates
            .choose(&mut rand::rng())
            .cloned()
            .unwrap_or_else(|| RoutingResult::rejected(strategy, "no mapping satisfies the context-window floor"))
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

    fn registry() -> ModelRegistry {
        let mut providers = IndexMap::new();
        providers.insert("openai".to_owned(), provider_config(ProviderType::Openai));
        providers.insert("anthropic".to_owned(), provider_config(ProviderType::Anthropic));
        ModelRegistry::build(&providers, &HashMap::new(), &[])
    }

    fn mapping(provider: &str, model: &str) -> ModelMapping {
        ModelMapping {
            provider: provider.to_owned(),
            provider_model_id: model.to_owned(),
        }
    }

    fn query() -> RouteQuery {
        RouteQuery {
            model: "auto".to_owned(),
            user: None,
            message_count: 1,
            total_chars: 10,
            user_text: String::new(),
            max_tokens: None,
            temperature: None,
        }
    }

    #[test]
    fn picks_only_from_the_mapping_table() {
        let registry = registry();
        let mut options = RoutingOptions::default();
        options.model_mappings.insert("a".to_owned(), mapping("openai", "gpt-4"));
        options
            .model_mappings
            .insert("b".to_owned(), mapping("anthropic", "claude-3-haiku-20240307"));
        let ctx = RouterContext {
            registry: &registry,
            options: &options,
            performance: None,
            health: None,
        };

        for _ in 0..20 {
            let result = LoadBalanceRouter.route(&query(), &ctx);
            assert!(result.success);
            assert!(["openai.gpt-4", "anthropic.claude-3-haiku"].contains(&result.model_id.as_str()));
        }
    }

    #[test]
    fn context_floor_filters_candidates() {
        let registry = registry();
        let mut options = RoutingOptions::default();
        options.min_context_window = 100_000;
        // gpt-4 has an 8k window and must never be picked
        options.model_mappings.insert("a".to_owned(), mapping("openai", "gpt-4"));
        options
            .model_mappings
            .insert("b".to_owned(), mapping("anthropic", "claude-3-opus-20240229"));
        let ctx = RouterContext {
            registry: &registry,
            options: &options,
            performance: None,
            health: None,
        };

        for _ in 0..20 {
            let result = LoadBalanceRouter.route(&query(), &ctx);
            assert!(result.success);
            assert_eq!(result.model_id, "anthropic.claude-3-opus");
        }
    }

    #[test]
    fn empty_mapping_table_rejects() {
        let registry = registry();
        let options = RoutingOptions::default();
        let ctx = RouterContext {
            registry: &registry,
            options: &options,
            performance: None,
            health: None,
        };
        assert!(!LoadBalanceRouter.route(&query(), &ctx).success);
    }

    #[test]
    fn disabled_toggle_rejects() {
        let registry = registry();
        let mut options = RoutingOptions {
            enable_load_balancing: false,
            ..Default::default()
        };
        options.model_mappings.insert("a".to_owned(), mapping("openai", "gpt-4"));
        let ctx = RouterContext {
            registry: &registry,
            options: &options,
            performance: None,
            health: None,
        };
        assert!(!LoadBalanceRouter.route(&query(), &ctx).success);
    }
}
