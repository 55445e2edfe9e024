use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Top-level gateway configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// HTTP serving surface
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging output
    #[serde(default)]
    pub log: LogConfig,
    /// Provider configurations keyed by name
    #[serde(default)]
    pub providers: IndexMap<String, ProviderConfig>,
    /// Model routing options
    #[serde(default)]
    pub routing: RoutingOptions,
    /// Fallback-chain options
    #[serde(default)]
    pub fallback: FallbackOptions,
    /// Health-probe options
    #[serde(default)]
    pub health: HealthOptions,
    /// Performance-degradation thresholds
    #[serde(default)]
    pub performance: PerformanceOptions,
    /// Alert delivery options
    #[serde(default)]
    pub alerts: AlertOptions,
    /// Model registry overrides
    #[serde(default)]
    pub registry: RegistryOptions,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_listen")]
    pub listen: std::net::SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> std::net::SocketAddr {
    std::net::SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Default log filter (overridden by `RUST_LOG`)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON-formatted log lines
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}

/// Configuration for a single LLM provider
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Provider protocol type
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    /// API key for authentication
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// API version (Azure query parameter, Anthropic version header)
    #[serde(default)]
    pub api_version: Option<String>,
    /// Per-request timeout toward this provider, in seconds
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    /// Forward the client's bearer token to the provider
    #[serde(default)]
    pub forward_authorization: bool,
}

const fn default_request_timeout_seconds() -> u64 {
    30
}

/// Supported provider protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// OpenAI-compatible API
    Openai,
    /// Azure-hosted OpenAI deployments
    AzureOpenai,
    /// Anthropic Messages API
    Anthropic,
    /// Cohere v2 chat API
    Cohere,
    /// Hugging Face inference router
    Huggingface,
}

// -- Routing options --

/// Model routing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingOptions {
    /// Master toggle for strategy-based routing
    #[serde(default)]
    pub enable_smart_routing: bool,
    /// Enable the content-based sub-router
    #[serde(default = "default_true")]
    pub enable_content_routing: bool,
    /// Enable the cost-optimised sub-router
    #[serde(default = "default_true")]
    pub enable_cost_routing: bool,
    /// Enable the latency-optimised sub-router
    #[serde(default = "default_true")]
    pub enable_latency_routing: bool,
    /// Enable the quality-optimised sub-router
    #[serde(default = "default_true")]
    pub enable_quality_routing: bool,
    /// Enable the load-balanced sub-router
    #[serde(default = "default_true")]
    pub enable_load_balancing: bool,
    /// Direct mappings: requested model id → provider target
    #[serde(default)]
    pub model_mappings: IndexMap<String, ModelMapping>,
    /// Alias → target model id
    #[serde(default)]
    pub model_aliases: IndexMap<String, String>,
    /// Per-user model overrides: user id → model id
    #[serde(default)]
    pub user_model_preferences: IndexMap<String, String>,
    /// Per-user strategy pins: user id → strategy
    #[serde(default)]
    pub user_routing_preferences: IndexMap<String, StrategyName>,
    /// Per-model strategy pins: model id → strategy
    #[serde(default)]
    pub model_routing_strategies: IndexMap<String, StrategyName>,
    /// Minimum context window for load-balanced candidates
    #[serde(default)]
    pub min_context_window: u32,
}

impl Default for RoutingOptions {
    fn default() -> Self {
        Self {
            enable_smart_routing: false,
            enable_content_routing: true,
            enable_cost_routing: true,
            enable_latency_routing: true,
            enable_quality_routing: true,
            enable_load_balancing: true,
            model_mappings: IndexMap::new(),
            model_aliases: IndexMap::new(),
            user_model_preferences: IndexMap::new(),
            user_routing_preferences: IndexMap::new(),
            model_routing_strategies: IndexMap::new(),
            min_context_window: 0,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Target of a direct model mapping
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelMapping {
    /// Provider name (key in the providers table)
    pub provider: String,
    /// Model identifier the provider expects on the wire
    pub provider_model_id: String,
}

/// Named routing strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyName {
    /// Static mapping-table lookup
    DirectMapping,
    /// Classify the prompt and pick a family-preferred model
    ContentBased,
    /// Minimise estimated request cost
    CostOptimized,
    /// Minimise expected latency
    LatencyOptimized,
    /// Prefer flagship models
    QualityOptimized,
    /// Uniform-random pick across mappings
    LoadBalanced,
}

impl StrategyName {
    /// Stable string form used in routing results and logs
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DirectMapping => "DirectMapping",
            Self::ContentBased => "ContentBased",
            Self::CostOptimized => "CostOptimized",
            Self::LatencyOptimized => "LatencyOptimized",
            Self::QualityOptimized => "QualityOptimized",
            Self::LoadBalanced => "LoadBalanced",
        }
    }
}

// -- Fallback options --

/// Configuration for the fallback executor
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FallbackOptions {
    /// Master toggle
    #[serde(default)]
    pub enabled: bool,
    /// Total attempt cap, including the primary
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Deadline for each individual attempt, in seconds
    #[serde(default = "default_attempt_timeout_seconds")]
    pub attempt_timeout_seconds: u64,
    /// Per-model fallback chains
    #[serde(default)]
    pub rules: Vec<FallbackRule>,
}

impl Default for FallbackOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: default_max_attempts(),
            attempt_timeout_seconds: default_attempt_timeout_seconds(),
            rules: Vec::new(),
        }
    }
}

const fn default_max_attempts() -> usize {
    4
}

const fn default_attempt_timeout_seconds() -> u64 {
    30
}

/// Ordered substitutes for a model, with an optional error filter
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FallbackRule {
    /// Model id the rule applies to
    pub model: String,
    /// Substitute model ids, in priority order
    pub fallbacks: Vec<String>,
    /// Error codes that trigger the chain; empty means any error
    #[serde(default)]
    pub error_codes: Vec<String>,
}

// -- Health options --

/// Health-probe configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthOptions {
    /// Minutes between probe rounds
    #[serde(default = "default_check_interval_minutes")]
    pub check_interval_minutes: u64,
    /// Consecutive probe failures before a provider-unavailable alert
    #[serde(default = "default_consecutive_failures")]
    pub consecutive_failures_before_alert: u32,
    /// Deadline for a single probe, in seconds
    #[serde(default = "default_probe_timeout_seconds")]
    pub probe_timeout_seconds: u64,
}

impl Default for HealthOptions {
    fn default() -> Self {
        Self {
            check_interval_minutes: default_check_interval_minutes(),
            consecutive_failures_before_alert: default_consecutive_failures(),
            probe_timeout_seconds: default_probe_timeout_seconds(),
        }
    }
}

const fn default_check_interval_minutes() -> u64 {
    1
}

const fn default_consecutive_failures() -> u32 {
    3
}

const fn default_probe_timeout_seconds() -> u64 {
    5
}

// -- Performance options --

/// Thresholds for model-performance alerting
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerformanceOptions {
    /// Success rate below which a model is considered degraded
    #[serde(default = "default_min_success_rate")]
    pub min_success_rate: f64,
    /// Average latency above which a model is considered degraded
    #[serde(default = "default_max_average_latency_ms")]
    pub max_average_latency_ms: f64,
    /// Observations required before thresholds apply
    #[serde(default = "default_min_samples")]
    pub min_samples: u64,
}

impl Default for PerformanceOptions {
    fn default() -> Self {
        Self {
            min_success_rate: default_min_success_rate(),
            max_average_latency_ms: default_max_average_latency_ms(),
            min_samples: default_min_samples(),
        }
    }
}

const fn default_min_success_rate() -> f64 {
    0.8
}

const fn default_max_average_latency_ms() -> f64 {
    10_000.0
}

const fn default_min_samples() -> u64 {
    10
}

// -- Alert options --

/// Alert delivery configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertOptions {
    /// Master toggle for the alert sink
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for AlertOptions {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// -- Registry options --

/// Administrator-configured model registry entries
///
/// Entries here win over dynamically discovered models, which in turn
/// win over the built-in catalogue.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryOptions {
    /// Model descriptors to add or override
    #[serde(default)]
    pub models: Vec<ModelInfoConfig>,
}

/// Configured model descriptor
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelInfoConfig {
    /// Canonical id, `provider.model` form (e.g. `anthropic.claude-3-opus`)
    pub id: String,
    /// Provider name (key in the providers table)
    pub provider: String,
    /// Model identifier the provider expects on the wire
    pub provider_model_id: String,
    /// Human-readable name
    #[serde(default)]
    pub display_name: Option<String>,
    /// Context window in tokens
    #[serde(default = "default_context_window")]
    pub context_window: u32,
    /// Cost per 1 000 input tokens (USD)
    #[serde(default)]
    pub input_cost_per_1k: f64,
    /// Cost per 1 000 output tokens (USD)
    #[serde(default)]
    pub output_cost_per_1k: f64,
    /// Latency estimate used before live metrics exist, in milliseconds
    #[serde(default)]
    pub default_latency_ms: Option<u64>,
    /// Capability flags
    #[serde(default)]
    pub capabilities: CapabilityFlags,
}

const fn default_context_window() -> u32 {
    8192
}

/// What a model can do
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapabilityFlags {
    /// Chat completions
    #[serde(default = "default_true")]
    pub completions: bool,
    /// Embedding generation
    #[serde(default)]
    pub embeddings: bool,
    /// Server-sent-event streaming
    #[serde(default = "default_true")]
    pub streaming: bool,
    /// Tool/function calling
    #[serde(default)]
    pub function_calling: bool,
    /// Image inputs
    #[serde(default)]
    pub vision: bool,
}

impl Default for CapabilityFlags {
    fn default() -> Self {
        Self {
            completions: true,
            embeddings: false,
            streaming: true,
            function_calling: false,
            vision: false,
        }
    }
}
