//! Quality-optimised routing
//!
//! Walks a fixed flagship list and picks the first model the registry
//! knows about. Unsuccessful when none of the flagships is mapped.

use prism_config::StrategyName;

use crate::analysis::RouteQuery;
use crate::router::RouterContext;
use crate::strategy::{RouteStrategy, RoutingResult};

/// Flagship models, in descending preference
const FLAGSHIPS: &[&str] = &[
    "anthropic.claude-3-opus",
    "openai.gpt-4-turbo",
    "anthropic.claude-3-5-sonnet",
    "openai.gpt-4",
];

pub struct QualityRouter;

impl RouteStrategy for QualityRouter {
    fn name(&self) -> StrategyName {
        StrategyName::QualityOptimized
    }

    fn route(&self, _query: &RouteQuery, ctx: &RouterContext<'_>) -> RoutingResult {
        let strategy = StrategyName::QualityOptimized.as_str();

        if !ctx.options.enable_quality_routing {
            return RoutingResult::rejected(strategy, "quality routing disabled");
        }

        FLAGSHIPS
            .iter()
            .filter_map(|id| ctx.registry.get_model(id))
            .find(|info| info.capabilities.completions)
            .map_or_else(
                || RoutingResult::rejected(strategy, "no flagship model is registered"),
                |info| RoutingResult::selected(info, strategy, "highest-quality available flagship"),
            )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use indexmap::IndexMap;
    use prism_config::{ProviderType, RoutingOptions};

    use super::*;
    use crate::registry::ModelRegistry;
    use crate::registry::tests::provider_config;

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
    fn picks_first_registered_flagship() {
        let mut providers = IndexMap::new();
        providers.insert("anthropic".to_owned(), provider_config(ProviderType::Anthropic));
        providers.insert("openai".to_owned(), provider_config(ProviderType::Openai));
        let registry = ModelRegistry::build(&providers, &HashMap::new(), &[]);
        let options = RoutingOptions::default();
        let ctx = RouterContext {
            registry: &registry,
            options: &options,
            performance: None,
            health: None,
        };

        let result = QualityRouter.route(&query(), &ctx);
        assert!(result.success);
        assert_eq!(result.model_id, "anthropic.claude-3-opus");
    }

    #[test]
    fn walks_list_when_top_flagship_is_absent() {
        let mut providers = IndexMap::new();
        providers.insert("openai".to_owned(), provider_config(ProviderType::Openai));
        let registry = ModelRegistry::build(&providers, &HashMap::new(), &[]);
        let options = RoutingOptions::default();
        let ctx = RouterContext {
            registry: &registry,
            options: &options,
            performance: None,
            health: None,
        };

        let result = QualityRouter.route(&query(), &ctx);
        assert!(result.success);
        assert_eq!(result.model_id, "openai.gpt-4-turbo");
    }

    #[test]
    fn unsuccessful_without_any_flagship() {
        let mut providers = IndexMap::new();
        providers.insert("cohere".to_owned(), provider_config(ProviderType::Cohere));
        let registry = ModelRegistry::build(&providers, &HashMap::new(), &[]);
        let options = RoutingOptions::default();
        let ctx = RouterContext {
            registry: &registry,
            options: &options,
            performance: None,
            health: None,
        };

        assert!(!QualityRouter.route(&query(), &ctx).success);
    }

    #[test]
    fn disabled_toggle_rejects() {
        let registry = ModelRegistry::build(&IndexMap::new(), &HashMap::new(), &[]);
        let options = RoutingOptions {
            enable_quality_routing: false,
            ..Default::default()
        };
        let ctx = RouterContext {
            registry: &registry,
            options: &options,
            performance: None,
            health: None,
        };
        assert!(!QualityRouter.route(&query(), &ctx).success);
    }
}
