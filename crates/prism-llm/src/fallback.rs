//! Fallback execution across an ordered chain of substitute models
//!
//! The executor is the only place errors are swallowed, and only when a
//! configured substitute exists and the rule's error filter matches the
//! current failure. Substitutes are re-resolved through the router, so
//! their own mappings apply. A total-attempt cap and a per-attempt
//! deadline bound the chain; cancellation stops it immediately.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use prism_config::{FallbackOptions, FallbackRule};
use prism_core::RequestContext;
use prism_monitor::{HealthMonitor, PerformanceMonitor};
use prism_routing::RoutingResult;

use crate::error::GatewayError;
use crate::provider::{CompletionStream, ProviderAdapter};
use crate::types::{CompletionRequest, CompletionResponse};

/// Orchestrates completion attempts over the fallback chain
pub struct FallbackExecutor {
    providers: HashMap<String, Arc<dyn ProviderAdapter>>,
    options: FallbackOptions,
    /// Rules keyed by the model id they apply to
    rules: HashMap<String, FallbackRule>,
    performance: Arc<PerformanceMonitor>,
    health: Option<Arc<HealthMonitor>>,
}

impl FallbackExecutor {
    /// Create an executor over the given adapters and rules
    pub fn new(
        providers: HashMap<String, Arc<dyn ProviderAdapter>>,
        options: FallbackOptions,
        performance: Arc<PerformanceMonitor>,
        health: Option<Arc<HealthMonitor>>,
    ) -> Self {
        let rules = options.rules.iter().map(|r| (r.model.clone(), r.clone())).collect();
        Self {
            providers,
            options,
            rules,
            performance,
            health,
        }
    }

    /// Run a non-streaming completion, walking the fallback chain on failure
    ///
    /// `resolve` re-routes each substitute model id; unresolvable or
    /// unhealthy substitutes are skipped without consuming an attempt.
    pub async fn execute<F>(
        &self,
        request: &CompletionRequest,
        primary: RoutingResult,
        resolve: F,
        context: &RequestContext,
    ) -> Result<CompletionResponse, GatewayError>
    where
        F: Fn(&str) -> RoutingResult,
    {
        let rule = self.rules.get(&primary.model_id);
        let mut pending: VecDeque<String> = rule.map(|r| r.fallbacks.iter().cloned().collect()).unwrap_or_default();

        let mut route = primary;
        let mut attempts = 0usize;
        let mut fell_back = false;

        loop {
            attempts += 1;
            match self.attempt_completion(request, &route, context).await {
                Ok(response) => return Ok(response),
                Err(error) => {
                    let Some(next) = self.next_route(rule, &mut pending, &error, attempts, context, &resolve) else {
                        return Err(Self::chain_error(error, attempts, fell_back));
                    };

                    tracing::warn!(
                        from_provider = %route.provider,
                        from_model = %route.model_id,
                        to_provider = %next.provider,
                        to_model = %next.model_id,
                        error = %error,
                        "attempt failed, falling back"
                    );

                    fell_back = true;
                    route = next;
                }
            }
        }
    }

    /// Run a streaming completion with failover before the stream starts
    ///
    /// Once an upstream stream has been established the response is
    /// committed to that backend; later failures surface as stream
    /// errors, never as a new attempt.
    pub async fn execute_stream<F>(
        &self,
        request: &CompletionRequest,
        primary: RoutingResult,
        resolve: F,
        context: &RequestContext,
    ) -> Result<(RoutingResult, CompletionStream), GatewayError>
    where
        F: Fn(&str) -> RoutingResult,
    {
        let rule = self.rules.get(&primary.model_id);
        let mut pending: VecDeque<String> = rule.map(|r| r.fallbacks.iter().cloned().collect()).unwrap_or_default();

        let mut route = primary;
        let mut attempts = 0usize;
        let mut fell_back = false;

        loop {
            attempts += 1;
            match self.attempt_stream(request, &route, context).await {
                Ok(stream) => return Ok((route, stream)),
                Err(error) => {
                    let Some(next) = self.next_route(rule, &mut pending, &error, attempts, context, &resolve) else {
                        return Err(Self::chain_error(error, attempts, fell_back));
                    };

                    tracing::warn!(
                        from_provider = %route.provider,
                        to_provider = %next.provider,
                        error = %error,
                        "stream attempt failed, falling back"
                    );

                    fell_back = true;
                    route = next;
                }
            }
        }
    }

    /// One completion attempt against the routed provider
    async fn attempt_completion(
        &self,
        request: &CompletionRequest,
        route: &RoutingResult,
        context: &RequestContext,
    ) -> Result<CompletionResponse, GatewayError> {
        let provider = self.provider_for(route)?;

        let mut attempt_request = request.clone();
        attempt_request.model.clone_from(&route.provider_model_id);

        let deadline = Duration::from_secs(self.options.attempt_timeout_seconds);
        let start = Instant::now();

        let result = match tokio::time::timeout(deadline, provider.create_completion(&attempt_request, context)).await
        {
            Ok(result) => result,
            Err(_) => Err(GatewayError::ProviderUnavailable {
                provider: route.provider.clone(),
                message: format!("attempt exceeded {}s deadline", self.options.attempt_timeout_seconds),
            }),
        };

        self.performance.record(&route.model_id, result.is_ok(), start.elapsed());
        result
    }

    /// One stream-establishment attempt against the routed provider
    async fn attempt_stream(
        &self,
        request: &CompletionRequest,
        route: &RoutingResult,
        context: &RequestContext,
    ) -> Result<CompletionStream, GatewayError> {
        let provider = self.provider_for(route)?;

        let mut attempt_request = request.clone();
        attempt_request.model.clone_from(&route.provider_model_id);

        let deadline = Duration::from_secs(self.options.attempt_timeout_seconds);
        let start = Instant::now();

        let result = match tokio::time::timeout(
            deadline,
            provider.create_completion_stream(&attempt_request, context),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(GatewayError::ProviderUnavailable {
                provider: route.provider.clone(),
                message: format!("attempt exceeded {}s deadline", self.options.attempt_timeout_seconds),
            }),
        };

        self.performance.record(&route.model_id, result.is_ok(), start.elapsed());
        result
    }

    fn provider_for(&self, route: &RoutingResult) -> Result<&Arc<dyn ProviderAdapter>, GatewayError> {
        self.providers
            .get(&route.provider)
            .ok_or_else(|| GatewayError::ProviderNotFound {
                provider: route.provider.clone(),
            })
    }

    /// Select the next substitute, or `None` to stop the chain
    fn next_route<F>(
        &self,
        rule: Option<&FallbackRule>,
        pending: &mut VecDeque<String>,
        error: &GatewayError,
        attempts_made: usize,
        context: &RequestContext,
        resolve: &F,
    ) -> Option<RoutingResult>
    where
        F: Fn(&str) -> RoutingResult,
    {
        if !self.options.enabled {
            return None;
        }

        // Cancellation stops the chain: no retry, no fallback
        if context.is_cancelled() {
            return None;
        }

        let rule = rule?;

        // The filter is checked against each failure, so a chain that
        // started on a matching code stops when a later attempt fails
        // differently
        if !rule.error_codes.is_empty() && !rule.error_codes.iter().any(|code| code == error.code()) {
            return None;
        }

        while attempts_made < self.options.max_attempts {
            let candidate = pending.pop_front()?;
            let resolved = resolve(&candidate);

            if !resolved.success {
                tracing::debug!(model = %candidate, "skipping unresolvable fallback candidate");
                continue;
            }

            if let Some(health) = &self.health
                && !health.is_available(&resolved.provider)
            {
                tracing::debug!(provider = %resolved.provider, "skipping unhealthy fallback provider");
                continue;
            }

            if !self.providers.contains_key(&resolved.provider) {
                tracing::debug!(provider = %resolved.provider, "skipping unconfigured fallback provider");
                continue;
            }

            return Some(resolved);
        }

        None
    }

    /// Final error once the chain stops
    fn chain_error(last: GatewayError, attempts: usize, fell_back: bool) -> GatewayError {
        if fell_back {
            GatewayError::FallbackExhausted {
                attempts,
                last: Box::new(last),
            }
        } else {
            last
        }
    }
}
