use std::path::Path;

use crate::GatewayConfig;

impl GatewayConfig {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `${VAR}` placeholders, then deserializes
    /// and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let expanded =
            crate::env::expand_env(&raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error when cross-references between tables are broken
    pub fn validate(&self) -> anyhow::Result<()> {
        for (model, mapping) in &self.routing.model_mappings {
            if !self.providers.contains_key(&mapping.provider) {
                anyhow::bail!("model mapping '{model}' references unknown provider '{}'", mapping.provider);
            }
        }

        for entry in &self.registry.models {
            if !self.providers.contains_key(&entry.provider) {
                anyhow::bail!(
                    "registry model '{}' references unknown provider '{}'",
                    entry.id,
                    entry.provider
                );
            }
        }

        for rule in &self.fallback.rules {
            if rule.fallbacks.is_empty() {
                anyhow::bail!("fallback rule for '{}' has no substitutes", rule.model);
            }
        }

        if self.fallback.max_attempts == 0 {
            anyhow::bail!("fallback.max_attempts must be at least 1");
        }

        if self.health.check_interval_minutes == 0 {
            anyhow::bail!("health.check_interval_minutes must be at least 1");
        }

        Ok(())
    }
}
