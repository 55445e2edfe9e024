//! Built-in model catalogue
//!
//! Some providers (Anthropic in particular) expose no list-models
//! endpoint, so the gateway ships a curated catalogue per provider type.
//! Catalogue rows are the lowest-precedence registry source: discovered
//! listings add to them and configured overrides replace them.

use prism_config::{CapabilityFlags, ProviderType};

/// A curated catalogue entry, instantiated per configured provider
#[derive(Debug, Clone)]
pub struct CatalogModel {
    /// Short id appended to the provider name to form the canonical id
    pub short_id: &'static str,
    /// Model identifier the provider expects on the wire
    pub provider_model_id: &'static str,
    /// Human-readable name
    pub display_name: &'static str,
    /// Context window in tokens
    pub context_window: u32,
    /// Cost per 1 000 input tokens (USD)
    pub input_cost_per_1k: f64,
    /// Cost per 1 000 output tokens (USD)
    pub output_cost_per_1k: f64,
    /// Latency estimate used before live metrics exist
    pub default_latency_ms: Option<u64>,
    /// Capability flags
    pub capabilities: CapabilityFlags,
}

const fn chat(function_calling: bool, vision: bool) -> CapabilityFlags {
    CapabilityFlags {
        completions: true,
        embeddings: false,
        streaming: true,
        function_calling,
        vision,
    }
}

const EMBEDDING: CapabilityFlags = CapabilityFlags {
    completions: false,
    embeddings: true,
    streaming: false,
    function_calling: false,
    vision: false,
};

/// Catalogue rows for a provider type
pub fn builtin(provider_type: ProviderType) -> &'static [CatalogModel] {
    match provider_type {
        ProviderType::Openai => OPENAI,
        ProviderType::Anthropic => ANTHROPIC,
        ProviderType::Cohere => COHERE,
        ProviderType::Huggingface => HUGGINGFACE,
        // Azure deployments are account-specific; models come from
        // mappings and configured overrides only
        ProviderType::AzureOpenai => &[],
    }
}

static OPENAI: &[CatalogModel] = &[
    CatalogModel {
        short_id: "gpt-4-turbo",
        provider_model_id: "gpt-4-turbo",
        display_name: "GPT-4 Turbo",
        context_window: 128_000,
        input_cost_per_1k: 0.01,
        output_cost_per_1k: 0.03,
        default_latency_ms: Some(1000),
        capabilities: chat(true, true),
    },
    CatalogModel {
        short_id: "gpt-4",
        provider_model_id: "gpt-4",
        display_name: "GPT-4",
        context_window: 8_192,
        input_cost_per_1k: 0.03,
        output_cost_per_1k: 0.06,
        default_latency_ms: Some(1500),
        capabilities: chat(true, false),
    },
    CatalogModel {
        short_id: "gpt-3.5-turbo",
        provider_model_id: "gpt-3.5-turbo",
        display_name: "GPT-3.5 Turbo",
        context_window: 16_385,
        input_cost_per_1k: 0.0005,
        output_cost_per_1k: 0.0015,
        default_latency_ms: Some(800),
        capabilities: chat(true, false),
    },
    CatalogModel {
        short_id: "text-embedding-3-small",
        provider_model_id: "text-embedding-3-small",
        display_name: "Text Embedding 3 Small",
        context_window: 8_191,
        input_cost_per_1k: 0.000_02,
        output_cost_per_1k: 0.0,
        default_latency_ms: Some(200),
        capabilities: EMBEDDING,
    },
    CatalogModel {
        short_id: "text-embedding-3-large",
        provider_model_id: "text-embedding-3-large",
        display_name: "Text Embedding 3 Large",
        context_window: 8_191,
        input_cost_per_1k: 0.000_13,
        output_cost_per_1k: 0.0,
        default_latency_ms: Some(250),
        capabilities: EMBEDDING,
    },
];

static ANTHROPIC: &[CatalogModel] = &[
    CatalogModel {
        short_id: "claude-3-opus",
        provider_model_id: "claude-3-opus-20240229",
        display_name: "Claude 3 Opus",
        context_window: 200_000,
        input_cost_per_1k: 0.015,
        output_cost_per_1k: 0.075,
        default_latency_ms: Some(2000),
        capabilities: chat(true, true),
    },
    CatalogModel {
        short_id: "claude-3-5-sonnet",
        provider_model_id: "claude-3-5-sonnet-20241022",
        display_name: "Claude 3.5 Sonnet",
        context_window: 200_000,
        input_cost_per_1k: 0.003,
        output_cost_per_1k: 0.015,
        default_latency_ms: Some(900),
        capabilities: chat(true, true),
    },
    CatalogModel {
        short_id: "claude-3-sonnet",
        provider_model_id: "claude-3-sonnet-20240229",
        display_name: "Claude 3 Sonnet",
        context_window: 200_000,
        input_cost_per_1k: 0.003,
        output_cost_per_1k: 0.015,
        default_latency_ms: Some(1000),
        capabilities: chat(true, true),
    },
    CatalogModel {
        short_id: "claude-3-haiku",
        provider_model_id: "claude-3-haiku-20240307",
        display_name: "Claude 3 Haiku",
        context_window: 200_000,
        input_cost_per_1k: 0.000_25,
        output_cost_per_1k: 0.001_25,
        default_latency_ms: Some(500),
        capabilities: chat(true, true),
    },
];

static COHERE: &[CatalogModel] = &[
    CatalogModel {
        short_id: "command-r-plus",
        provider_model_id: "command-r-plus-08-2024",
        display_name: "Command R+",
        context_window: 128_000,
        input_cost_per_1k: 0.002_5,
        output_cost_per_1k: 0.01,
        default_latency_ms: Some(1200),
        capabilities: chat(true, false),
    },
    CatalogModel {
        short_id: "command-r",
        provider_model_id: "command-r-08-2024",
        display_name: "Command R",
        context_window: 128_000,
        input_cost_per_1k: 0.000_15,
        output_cost_per_1k: 0.000_6,
        default_latency_ms: Some(700),
        capabilities: chat(true, false),
    },
    CatalogModel {
        short_id: "embed-english-v3",
        provider_model_id: "embed-english-v3.0",
        display_name: "Embed English v3",
        context_window: 512,
        input_cost_per_1k: 0.000_1,
        output_cost_per_1k: 0.0,
        default_latency_ms: Some(150),
        capabilities: EMBEDDING,
    },
];

static HUGGINGFACE: &[CatalogModel] = &[
    CatalogModel {
        short_id: "mixtral-8x7b-instruct",
        provider_model_id: "mistralai/Mixtral-8x7B-Instruct-v0.1",
        display_name: "Mixtral 8x7B Instruct",
        context_window: 32_768,
        input_cost_per_1k: 0.000_6,
        output_cost_per_1k: 0.000_6,
        default_latency_ms: Some(1500),
        capabilities: chat(false, false),
    },
    CatalogModel {
        short_id: "llama-3-8b-instruct",
        provider_model_id: "meta-llama/Meta-Llama-3-8B-Instruct",
        display_name: "Llama 3 8B Instruct",
        context_window: 8_192,
        input_cost_per_1k: 0.000_2,
        output_cost_per_1k: 0.000_2,
        default_latency_ms: Some(1200),
        capabilities: chat(false, false),
    },
    CatalogModel {
        short_id: "all-minilm-l6-v2",
        provider_model_id: "sentence-transformers/all-MiniLM-L6-v2",
        display_name: "all-MiniLM-L6-v2",
        context_window: 512,
        input_cost_per_1k: 0.0,
        output_cost_per_1k: 0.0,
        default_latency_ms: Some(300),
        capabilities: EMBEDDING,
    },
];
