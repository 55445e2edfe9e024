//! Routing strategies
//!
//! Each sub-router implements [`RouteStrategy`] and is held by the smart
//! router in a map keyed by strategy name. A disabled or inapplicable
//! strategy returns an unsuccessful result and the orchestrator moves on.

pub mod content;
pub mod cost;
pub mod direct;
pub mod latency;
pub mod load_balance;
pub mod quality;

use prism_config::StrategyName;

use crate::analysis::RouteQuery;
use crate::registry::ModelInfo;
use crate::router::RouterContext;

/// Outcome of one routing attempt
#[derive(Debug, Clone)]
pub struct RoutingResult {
    /// Selected provider name
    pub provider: String,
    /// Canonical model id
    pub model_id: String,
    /// Model identifier the provider expects on the wire
    pub provider_model_id: String,
    /// Strategy that produced this result
    pub strategy: &'static str,
    /// Why this model was selected (or why selection failed)
    pub reason: String,
    /// Whether a model was selected
    pub success: bool,
    /// Failure description when unsuccessful
    pub error_message: Option<String>,
}

impl RoutingResult {
    /// Successful selection of a registry model
    pub fn selected(info: &ModelInfo, strategy: &'static str, reason: impl Into<String>) -> Self {
        Self {
            provider: info.provider.clone(),
            model_id: info.id.clone(),
            provider_model_id: info.provider_model_id.clone(),
            strategy,
            reason: reason.into(),
            success: true,
            error_message: None,
        }
    }

    /// Unsuccessful attempt
    pub fn rejected(strategy: &'static str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            provider: String::new(),
            model_id: String::new(),
            provider_model_id: String::new(),
            strategy,
            reason: message.clone(),
            success: false,
            error_message: Some(message),
        }
    }
}

/// A named routing policy
pub trait RouteStrategy: Send + Sync {
    /// Strategy identity
    fn name(&self) -> StrategyName;

    /// Attempt to select a (provider, model) pair for the query
    fn route(&self, query: &RouteQuery, ctx: &RouterContext<'_>) -> RoutingResult;
}
