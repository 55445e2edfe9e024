//! Collaborator interfaces supplied by the transport/persistence layers
//!
//! All sinks are best-effort: a failing sink must never abort request
//! handling, so every method is infallible from the caller's point of
//! view and implementations swallow (and log) their own errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Category of an operational alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// A provider failed consecutive health probes
    ProviderUnavailable,
    /// A model's success rate or latency degraded past its threshold
    ModelPerformance,
    /// Token consumption worth surfacing to operators
    TokenUsage,
}

impl AlertKind {
    /// Stable string form used in alert payloads and logs
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProviderUnavailable => "provider_unavailable",
            Self::ModelPerformance => "model_performance",
            Self::TokenUsage => "token_usage",
        }
    }
}

/// Destination for operational alerts
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver an alert; implementations must not block request handling
    async fn send(&self, kind: AlertKind, payload: serde_json::Value);
}

/// Alert sink that logs alerts through `tracing`
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn send(&self, kind: AlertKind, payload: serde_json::Value) {
        tracing::warn!(kind = kind.as_str(), %payload, "gateway alert");
    }
}

/// Alert sink that discards everything
pub struct NullAlertSink;

#[async_trait]
impl AlertSink for NullAlertSink {
    async fn send(&self, _kind: AlertKind, _payload: serde_json::Value) {}
}

/// A single health-probe observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRecord {
    /// Provider that was probed
    pub provider: String,
    /// Whether the probe succeeded
    pub available: bool,
    /// Probe round-trip latency in milliseconds
    pub latency_ms: u64,
    /// Unix timestamp (seconds) of the probe
    pub probed_at: u64,
    /// Probe error message, when the probe failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Token consumption for a single completed request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsageRecord {
    /// Correlation id of the request
    pub correlation_id: String,
    /// Provider that served the request
    pub provider: String,
    /// Canonical model id
    pub model: String,
    /// Tokens consumed by the prompt
    pub prompt_tokens: u32,
    /// Tokens generated in the completion
    pub completion_tokens: u32,
    /// End-user identifier, when the request carried one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Append-only persistence for operational records
///
/// Writes are fire-and-forget; the gateway never waits on durability.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Append a health-probe observation
    async fn append_health(&self, record: HealthRecord);

    /// Append token usage for a completed request
    async fn append_token_usage(&self, record: TokenUsageRecord);

    /// Append an arbitrary request-log line
    async fn append_request_log(&self, payload: serde_json::Value);
}

/// Persistence sink that discards everything
pub struct NullPersistenceSink;

#[async_trait]
impl PersistenceSink for NullPersistenceSink {
    async fn append_health(&self, _record: HealthRecord) {}
    async fn append_token_usage(&self, _record: TokenUsageRecord) {}
    async fn append_request_log(&self, _payload: serde_json::Value) {}
}

/// Outcome of a content-filter check
#[derive(Debug, Clone)]
pub enum ContentVerdict {
    /// Content may proceed
    Allow,
    /// Content is rejected
    Deny {
        /// Human-readable denial reason
        reason: String,
        /// Policy categories that matched
        categories: Vec<String>,
    },
}

/// Policy check consulted before a request reaches a provider
#[async_trait]
pub trait ContentFilter: Send + Sync {
    /// Inspect the concatenated request text
    async fn allow(&self, body: &str) -> ContentVerdict;
}
