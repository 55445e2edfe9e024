//! Smart-router orchestration
//!
//! Order of resolution for completions: alias table, per-user model
//! override, direct mapping, configured or heuristic strategy dispatch,
//! and finally a plain registry lookup. Embedding requests skip the
//! content/cost/latency strategies entirely.

use indexmap::IndexMap;
use prism_config::{RoutingOptions, StrategyName};
use prism_monitor::{HealthMonitor, PerformanceMonitor};

use crate::analysis::RouteQuery;
use crate::registry::ModelRegistry;
use crate::strategy::{self, RouteStrategy, RoutingResult};

/// Strategy label for plain registry resolution (step 5)
const REGISTRY_STRATEGY: &str = "Registry";

/// Read-only state a routing decision may consult
///
/// The registry and options are immutable for the current epoch; monitor
/// snapshots are eventually consistent.
pub struct RouterContext<'a> {
    /// Current model registry epoch
    pub registry: &'a ModelRegistry,
    /// Routing configuration
    pub options: &'a RoutingOptions,
    /// Live model metrics, when available
    pub performance: Option<&'a PerformanceMonitor>,
    /// Provider availability, when available
    pub health: Option<&'a HealthMonitor>,
}

/// Orchestrator over the six routing strategies
pub struct SmartRouter {
    strategies: IndexMap<StrategyName, Box<dyn RouteStrategy>>,
}

impl SmartRouter {
    /// Build the router with all six strategies registered
    pub fn new() -> Self {
        let mut strategies: IndexMap<StrategyName, Box<dyn RouteStrategy>> = IndexMap::new();

        for strategy in [
            Box::new(strategy::direct::DirectMappingRouter) as Box<dyn RouteStrategy>,
            Box::new(strategy::content::ContentRouter),
            Box::new(strategy::cost::CostRouter),
            Box::new(strategy::latency::LatencyRouter),
            Box::new(strategy::quality::QualityRouter),
            Box::new(strategy::load_balance::LoadBalanceRouter),
        ] {
            strategies.insert(strategy.name(), strategy);
        }

        Self { strategies }
    }

    /// Resolve a completion request to a (provider, model) pair
    pub fn route(&self, query: &RouteQuery, ctx: &RouterContext<'_>) -> RoutingResult {
        let query = self.resolve_requested_model(query, ctx);

        let direct = self.dispatch(StrategyName::DirectMapping, &query, ctx);
        if direct.success {
            return direct;
        }

        if ctx.options.enable_smart_routing {
            let strategy = self.select_strategy(&query, ctx);
            tracing::debug!(model = %query.model, strategy = strategy.as_str(), "dispatching routing strategy");

            let result = self.dispatch(strategy, &query, ctx);
            if result.success {
                tracing::info!(
                    provider = %result.provider,
                    model = %result.model_id,
                    strategy = result.strategy,
                    reason = %result.reason,
                    "smart routing selected model"
                );
                return result;
            }
        }

        self.resolve_from_registry(&query.model, ctx)
    }

    /// Resolve an embedding request
    ///
    /// Only direct mapping and registry lookup apply; the capability
    /// check against the selected model happens in the gateway, which
    /// owns the typed error for it.
    pub fn route_embedding(&self, model: &str, user: Option<&str>, ctx: &RouterContext<'_>) -> RoutingResult {
        let query = RouteQuery {
            model: model.to_owned(),
            user: user.map(ToOwned::to_owned),
            message_count: 0,
            total_chars: 0,
            user_text: String::new(),
            max_tokens: None,
            temperature: None,
        };
        let query = self.resolve_requested_model(&query, ctx);

        let direct = self.dispatch(StrategyName::DirectMapping, &query, ctx);
        if direct.success {
            return direct;
        }

        self.resolve_from_registry(&query.model, ctx)
    }

    /// Apply alias and per-user model overrides to the requested id
    fn resolve_requested_model(&self, query: &RouteQuery, ctx: &RouterContext<'_>) -> RouteQuery {
        let mut model = query.model.clone();

        if let Some(target) = ctx.options.model_aliases.get(&model) {
            tracing::debug!(alias = %model, target = %target, "resolved model alias");
            model = target.clone();
        }

        if let Some(user) = &query.user
            && let Some(preferred) = ctx.options.user_model_preferences.get(user)
        {
            tracing::debug!(user = %user, model = %preferred, "applying user model preference");
            model = preferred.clone();
        }

        query.with_model(model)
    }

    /// Pick the strategy for step 4: user pin, model pin, then heuristics
    fn select_strategy(&self, query: &RouteQuery, ctx: &RouterContext<'_>) -> StrategyName {
        if let Some(user) = &query.user
            && let Some(pinned) = ctx.options.user_routing_preferences.get(user)
        {
            return *pinned;
        }

        if let Some(pinned) = ctx.options.model_routing_strategies.get(&query.model) {
            return *pinned;
        }

        // Heuristic defaults: low temperature wants determinism and
        // quality; long generations dominate cost; everything else is
        // spread across the pool
        if query.temperature.is_some_and(|t| t < 0.3) {
            StrategyName::QualityOptimized
        } else if query.max_tokens.is_some_and(|m| m > 1000) {
            StrategyName::CostOptimized
        } else {
            StrategyName::LoadBalanced
        }
    }

    fn dispatch(&self, name: StrategyName, query: &RouteQuery, ctx: &RouterContext<'_>) -> RoutingResult {
        self.strategies.get(&name).map_or_else(
            || RoutingResult::rejected(name.as_str(), "strategy not registered"),
            |strategy| strategy.route(query, ctx),
        )
    }

    /// Step 5: resolve the model id straight from the registry
    fn resolve_from_registry(&self, model: &str, ctx: &RouterContext<'_>) -> RoutingResult {
        ctx.registry.get_model(model).map_or_else(
            || RoutingResult::rejected(REGISTRY_STRATEGY, format!("no provider for model '{model}'")),
            |info| RoutingResult::selected(info, REGISTRY_STRATEGY, "registry lookup"),
        )
    }
}

impl Default for SmartRouter {
    fn default() -> Self {
        Self::new()
    }
}
