//! Model registry
//!
//! Merges three sources into one immutable table per epoch: the built-in
//! catalogue, model listings discovered from providers at runtime, and
//! administrator-configured overrides. Precedence: overrides win over
//! discovered entries, discovered entries win over the catalogue.
//! Resolution is deterministic and stable across restarts for a given
//! configuration.

use std::collections::HashMap;

use indexmap::IndexMap;
use prism_config::{CapabilityFlags, ModelInfoConfig, ProviderConfig};

use crate::catalog;

/// Immutable descriptor for one model
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Canonical id, `provider.model` form (e.g. `anthropic.claude-3-opus`)
    pub id: String,
    /// Provider name (key in the providers table)
    pub provider: String,
    /// Model identifier the provider expects on the wire
    pub provider_model_id: String,
    /// Human-readable name
    pub display_name: String,
    /// Context window in tokens
    pub context_window: u32,
    /// Capability flags
    pub capabilities: CapabilityFlags,
    /// Cost per 1 000 input tokens (USD)
    pub input_cost_per_1k: f64,
    /// Cost per 1 000 output tokens (USD)
    pub output_cost_per_1k: f64,
    /// Latency estimate used before live metrics exist
    pub default_latency_ms: Option<u64>,
}

/// Registry of every known model, immutable per configuration epoch
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelInfo>,
}

impl ModelRegistry {
    /// Build a registry from the three merge sources
    ///
    /// `discovered` maps provider name → provider-native model ids fetched
    /// from list-models endpoints. Discovered ids already present via the
    /// catalogue confirm the curated row (listings carry no cost or
    /// capability data to win with); unknown ids are added with
    /// conservative defaults.
    pub fn build(
        providers: &IndexMap<String, ProviderConfig>,
        discovered: &HashMap<String, Vec<String>>,
        overrides: &[ModelInfoConfig],
    ) -> Self {
        let mut models = IndexMap::new();

        // Lowest precedence: the curated catalogue, per configured provider
        for (name, provider_config) in providers {
            for entry in catalog::builtin(provider_config.provider_type) {
                let id = format!("{name}.{}", entry.short_id);
                models.insert(
                    id.clone(),
                    ModelInfo {
                        id,
                        provider: name.clone(),
                        provider_model_id: entry.provider_model_id.to_owned(),
                        display_name: entry.display_name.to_owned(),
                        context_window: entry.context_window,
                        capabilities: entry.capabilities,
                        input_cost_per_1k: entry.input_cost_per_1k,
                        output_cost_per_1k: entry.output_cost_per_1k,
                        default_latency_ms: entry.default_latency_ms,
                    },
                );
            }
        }

        // Discovered listings add models the catalogue does not know
        for (provider, ids) in discovered {
            if !providers.contains_key(provider) {
                continue;
            }
            for provider_model_id in ids {
                let already_known = models
                    .values()
                    .any(|m| &m.provider == provider && &m.provider_model_id == provider_model_id);
                if already_known {
                    continue;
                }

                let id = format!("{provider}.{provider_model_id}");
                let looks_like_embedding = provider_model_id.contains("embed");
                models.insert(
                    id.clone(),
                    ModelInfo {
                        id,
                        provider: provider.clone(),
                        provider_model_id: provider_model_id.clone(),
                        display_name: provider_model_id.clone(),
                        context_window: 8192,
                        capabilities: CapabilityFlags {
                            completions: !looks_like_embedding,
                            embeddings: looks_like_embedding,
                            streaming: !looks_like_embedding,
                            function_calling: false,
                            vision: false,
                        },
                        input_cost_per_1k: 0.0,
                        output_cost_per_1k: 0.0,
                        default_latency_ms: None,
                    },
                );
            }
        }

        // Highest precedence: administrator overrides
        for entry in overrides {
            models.insert(
                entry.id.clone(),
                ModelInfo {
                    id: entry.id.clone(),
                    provider: entry.provider.clone(),
                    provider_model_id: entry.provider_model_id.clone(),
                    display_name: entry.display_name.clone().unwrap_or_else(|| entry.id.clone()),
                    context_window: entry.context_window,
                    capabilities: entry.capabilities,
                    input_cost_per_1k: entry.input_cost_per_1k,
                    output_cost_per_1k: entry.output_cost_per_1k,
                    default_latency_ms: entry.default_latency_ms,
                },
            );
        }

        Self { models }
    }

    /// All known models, in stable order
    pub fn list_models(&self) -> impl Iterator<Item = &ModelInfo> {
        self.models.values()
    }

    /// Look up a model by canonical id
    pub fn get_model(&self, id: &str) -> Option<&ModelInfo> {
        self.models.get(id)
    }

    /// Look up a model by its provider and wire identifier
    pub fn find_by_target(&self, provider: &str, provider_model_id: &str) -> Option<&ModelInfo> {
        self.models
            .values()
            .find(|m| m.provider == provider && m.provider_model_id == provider_model_id)
    }

    /// Models supporting every capability set in `required`
    pub fn filter_by_capability(&self, required: CapabilityFlags) -> Vec<&ModelInfo> {
        self.models
            .values()
            .filter(|m| {
                let c = m.capabilities;
                (!required.completions || c.completions)
                    && (!required.embeddings || c.embeddings)
                    && (!required.streaming || c.streaming)
                    && (!required.function_calling || c.function_calling)
                    && (!required.vision || c.vision)
            })
            .collect()
    }

    /// Models that can serve chat completions
    pub fn completion_models(&self) -> impl Iterator<Item = &ModelInfo> {
        self.models.values().filter(|m| m.capabilities.completions)
    }

    /// Number of known models
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use prism_config::ProviderType;

    use super::*;

    pub(crate) fn provider_config(provider_type: ProviderType) -> ProviderConfig {
        let toml = match provider_type {
            ProviderType::Openai => "type = \"openai\"",
            ProviderType::Anthropic => "type = \"anthropic\"",
            ProviderType::Cohere => "type = \"cohere\"",
            ProviderType::Huggingface => "type = \"huggingface\"",
            ProviderType::AzureOpenai => "type = \"azure_openai\"",
        };
        toml::from_str(toml).unwrap()
    }

    pub(crate) fn two_provider_registry() -> ModelRegistry {
        let mut providers = IndexMap::new();
        providers.insert("openai".to_owned(), provider_config(ProviderType::Openai));
        providers.insert("anthropic".to_owned(), provider_config(ProviderType::Anthropic));
        ModelRegistry::build(&providers, &HashMap::new(), &[])
    }

    #[test]
    fn catalogue_models_use_provider_name_in_canonical_id() {
        let registry = two_provider_registry();
        let opus = registry.get_model("anthropic.claude-3-opus").unwrap();
        assert_eq!(opus.provider, "anthropic");
        assert_eq!(opus.provider_model_id, "claude-3-opus-20240229");
        assert_eq!(opus.context_window, 200_000);
    }

    #[test]
    fn unknown_model_is_absent() {
        let registry = two_provider_registry();
        assert!(registry.get_model("openai.gpt-99").is_none());
    }

    #[test]
    fn discovered_models_are_added_without_duplicating_catalogue() {
        let mut providers = IndexMap::new();
        providers.insert("openai".to_owned(), provider_config(ProviderType::Openai));

        let mut discovered = HashMap::new();
        discovered.insert(
            "openai".to_owned(),
            vec!["gpt-4".to_owned(), "gpt-4o-mini".to_owned()],
        );

        let registry = ModelRegistry::build(&providers, &discovered, &[]);

        // gpt-4 stays the curated row with its cost data
        let gpt4 = registry.get_model("openai.gpt-4").unwrap();
        assert!((gpt4.input_cost_per_1k - 0.03).abs() < f64::EPSILON);

        // the unknown listing appears with defaults
        let mini = registry.get_model("openai.gpt-4o-mini").unwrap();
        assert!(mini.capabilities.completions);
        assert!((mini.input_cost_per_1k).abs() < f64::EPSILON);
    }

    #[test]
    fn discovered_listing_for_unconfigured_provider_is_ignored() {
        let mut discovered = HashMap::new();
        discovered.insert("ghost".to_owned(), vec!["model-x".to_owned()]);
        let registry = ModelRegistry::build(&IndexMap::new(), &discovered, &[]);
        assert!(registry.is_empty());
    }

    #[test]
    fn overrides_win_over_catalogue() {
        let mut providers = IndexMap::new();
        providers.insert("openai".to_owned(), provider_config(ProviderType::Openai));

        let override_toml = r#"
            id = "openai.gpt-4"
            provider = "openai"
            provider_model_id = "gpt-4-0613"
            context_window = 32768
            input_cost_per_1k = 0.01
            output_cost_per_1k = 0.02
        "#;
        let entry: ModelInfoConfig = toml::from_str(override_toml).unwrap();

        let registry = ModelRegistry::build(&providers, &HashMap::new(), &[entry]);
        let gpt4 = registry.get_model("openai.gpt-4").unwrap();
        assert_eq!(gpt4.provider_model_id, "gpt-4-0613");
        assert_eq!(gpt4.context_window, 32_768);
    }

    #[test]
    fn capability_filter_matches_all_required_flags() {
        let registry = two_provider_registry();
        let embedders = registry.filter_by_capability(CapabilityFlags {
            completions: false,
            embeddings: true,
            streaming: false,
            function_calling: false,
            vision: false,
        });
        assert!(!embedders.is_empty());
        assert!(embedders.iter().all(|m| m.capabilities.embeddings));
        assert!(embedders.iter().all(|m| m.provider == "openai"));
    }

    #[test]
    fn find_by_target_resolves_wire_ids() {
        let registry = two_provider_registry();
        let haiku = registry.find_by_target("anthropic", "claude-3-haiku-20240307").unwrap();
        assert_eq!(haiku.id, "anthropic.claude-3-haiku");
    }

    #[test]
    fn build_is_deterministic() {
        let a = two_provider_registry();
        let b = two_provider_registry();
        let ids_a: Vec<&str> = a.list_models().map(|m| m.id.as_str()).collect();
        let ids_b: Vec<&str> = b.list_models().map(|m| m.id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
    }
}
