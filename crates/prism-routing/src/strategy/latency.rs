//! Latency-optimised routing
//!
//! Uses live monitor averages once a model has enough observations,
//! falling back to the registry's default latency estimate and finally a
//! large sentinel for models nothing is known about. The base figure is
//! scaled by prompt size so huge prompts don't get sent to a model that
//! is only fast on small ones.

use prism_config::StrategyName;

use crate::analysis::{RouteQuery, estimated_input_tokens};
use crate::router::RouterContext;
use crate::strategy::{RouteStrategy, RoutingResult};

/// Observations required before live metrics are trusted
const MIN_OBSERVATIONS: u64 = 10;

/// Assumed latency for models with no metrics and no default, in ms
const UNKNOWN_LATENCY_MS: f64 = 5000.0;

pub struct LatencyRouter;

impl RouteStrategy for LatencyRouter {
    fn name(&self) -> StrategyName {
        StrategyName::LatencyOptimized
    }

    fn route(&self, query: &RouteQuery, ctx: &RouterContext<'_>) -> RoutingResult {
        let strategy = StrategyName::LatencyOptimized.as_str();

        if !ctx.options.enable_latency_routing {
            return RoutingResult::rejected(strategy, "latency routing disabled");
        }

        let est_in = estimated_input_tokens(query) as f64;
        let load_factor = (est_in / 1000.0).max(1.0);

        let fastest = ctx
            .registry
            .completion_models()
            .map(|info| {
                let observed = ctx
                    .performance
                    .and_then(|monitor| monitor.get_metrics(&info.id))
                    .filter(|m| m.request_count >= MIN_OBSERVATIONS)
                    .and_then(|m| m.average_latency_ms());

                let base = observed
                    .or_else(|| info.default_latency_ms.map(|ms| ms as f64))
                    .unwrap_or(UNKNOWN_LATENCY_MS);

                (base * load_factor, info)
            })
            .min_by(|(latency_a, a), (latency_b, b)| {
                latency_a
                    .partial_cmp(latency_b)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.id.cmp(&b.id))
            });

        fastest.map_or_else(
            || RoutingResult::rejected(strategy, "no completion-capable model registered"),
            |(latency, info)| {
                RoutingResult::selected(info, strategy, format!("expected latency {latency:.0} ms"))
            },
        )
    }
}
