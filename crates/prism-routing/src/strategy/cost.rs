//! Cost-optimised routing
//!
//! Estimates the price of serving the request on every completion-capable
//! model with known pricing and picks the cheapest. Ties break on the
//! lexicographically smallest canonical id so repeated requests land on
//! the same model.

use prism_config::StrategyName;

use crate::analysis::{RouteQuery, estimated_input_tokens, estimated_output_tokens};
use crate::registry::ModelInfo;
use crate::router::RouterContext;
use crate::strategy::{RouteStrategy, RoutingResult};

/// Estimated cost of running `query` on `model`, in USD
pub fn estimate_cost(model: &ModelInfo, query: &RouteQuery) -> f64 {
    let est_in = estimated_input_tokens(query) as f64;
    let est_out = f64::from(estimated_output_tokens(query));
    (model.input_cost_per_1k * est_in + model.output_cost_per_1k * est_out) / 1000.0
}

pub struct CostRouter;

impl RouteStrategy for CostRouter {
    fn name(&self) -> StrategyName {
        StrategyName::CostOptimized
    }

    fn route(&self, query: &RouteQuery, ctx: &RouterContext<'_>) -> RoutingResult {
        let strategy = StrategyName::CostOptimized.as_str();

        if !ctx.options.enable_cost_routing {
            return RoutingResult::rejected(strategy, "cost routing disabled");
        }

        let cheapest = ctx
            .registry
            .completion_models()
            .filter(|m| m.input_cost_per_1k > 0.0 || m.output_cost_per_1k > 0.0)
            .map(|m| (estimate_cost(m, query), m))
            .min_by(|(cost_a, a), (cost_b, b)| {
                cost_a
                    .partial_cmp(cost_b)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.id.cmp(&b.id))
            });

        cheapest.map_or_else(
            || RoutingResult::rejected(strategy, "no completion-capable model with known pricing"),
            |(cost, info)| {
                RoutingResult::selected(info, strategy, format!("estimated cost ${cost:.6} per request"))
            },
        )
    }
}
