//! Configuration parsing and validation.
//!
//! Strata configuration is loaded from TOML files with CLI overrides.
//! Sections mirror the architectural components: activation fan-out,
//! registry maintenance, tree building, and telemetry.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level Strata configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Activation orchestration configuration.
    #[serde(default)]
    pub activation: ActivationConfig,

    /// Registry maintenance configuration.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Display tree configuration.
    #[serde(default)]
    pub tree: TreeConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            activation: ActivationConfig::default(),
            registry: RegistryConfig::default(),
            tree: TreeConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Activation orchestration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationConfig {
    /// Maximum concurrent group transitions in a batch.
    /// 0 means "use available parallelism".
    #[serde(default)]
    pub max_concurrent: usize,

    /// Timeout for a single side-effect invocation in milliseconds.
    /// 0 disables the timeout; retries stay the side effect's business.
    #[serde(default = "default_effect_timeout_ms")]
    pub effect_timeout_ms: u64,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 0,
            effect_timeout_ms: default_effect_timeout_ms(),
        }
    }
}

impl ActivationConfig {
    /// Resolve the concurrency bound, substituting available parallelism
    /// for the 0 sentinel.
    pub fn resolved_concurrency(&self) -> usize {
        if self.max_concurrent > 0 {
            return self.max_concurrent;
        }
        std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(4)
    }
}

/// Registry maintenance configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Period of the stale-entry cleanup sweep in milliseconds.
    #[serde(default = "default_cleanup_interval_ms")]
    pub cleanup_interval_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_ms: default_cleanup_interval_ms(),
        }
    }
}

/// Display tree configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Category label used for groups the categorizer leaves unassigned
    /// when building trees from catalogs.
    #[serde(default = "default_fallback_category")]
    pub fallback_category: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            fallback_category: default_fallback_category(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// Default value functions

fn default_effect_timeout_ms() -> u64 {
    30_000
}

fn default_cleanup_interval_ms() -> u64 {
    30_000
}

fn default_fallback_category() -> String {
    "Uncategorized".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).with_context(|| "failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI overrides to the configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref log_level) = overrides.log_level {
            self.telemetry.log_level = log_level.clone();
        }
        if let Some(max_concurrent) = overrides.max_concurrent {
            self.activation.max_concurrent = max_concurrent;
        }
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<()> {
        self.validate_registry()?;
        self.validate_tree()?;
        self.validate_telemetry()?;
        Ok(())
    }

    fn validate_registry(&self) -> Result<()> {
        if self.registry.cleanup_interval_ms == 0 {
            anyhow::bail!("registry.cleanup_interval_ms must be > 0");
        }
        Ok(())
    }

    fn validate_tree(&self) -> Result<()> {
        if self.tree.fallback_category.is_empty() {
            anyhow::bail!("tree.fallback_category must not be empty");
        }
        Ok(())
    }

    fn validate_telemetry(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.telemetry.log_level.as_str()) {
            anyhow::bail!(
                "telemetry.log_level must be one of {:?}, got: {}",
                valid_levels,
                self.telemetry.log_level
            );
        }
        Ok(())
    }
}

/// CLI override options that can be applied to configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override log level.
    pub log_level: Option<String>,
    /// Override batch concurrency bound.
    pub max_concurrent: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.registry.cleanup_interval_ms, 30_000);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.activation.max_concurrent, 0);
        assert_eq!(config.tree.fallback_category, "Uncategorized");
    }

    #[test]
    fn rejects_bad_log_level() {
        let result = Config::from_toml("[telemetry]\nlog_level = \"loud\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_zero_cleanup_interval() {
        let result = Config::from_toml("[registry]\ncleanup_interval_ms = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn overrides_apply() {
        let mut config = Config::default();
        config.apply_overrides(&ConfigOverrides {
            log_level: Some("debug".to_string()),
            max_concurrent: Some(2),
        });
        assert_eq!(config.telemetry.log_level, "debug");
        assert_eq!(config.activation.max_concurrent, 2);
        assert_eq!(config.activation.resolved_concurrency(), 2);
    }

    #[test]
    fn zero_concurrency_resolves_to_parallelism() {
        let config = ActivationConfig::default();
        assert!(config.resolved_concurrency() >= 1);
    }
}
