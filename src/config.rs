// src/config.rs

//! Manages router configuration: loading from TOML and validation.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::info;
use tracing_subscriber::filter::EnvFilter;

/// Settings for a `ClientRouter`.
///
/// Loaded from the `[router]` table of a TOML file. Every field has a default, so an
/// empty table (or no table at all) is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouterConfig {
    /// Overrides the service name remote clients are bound to. When unset, the
    /// transport channel's own service name is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    /// If `false`, the router records nothing in the Prometheus registry.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    /// A log filter directive for the embedding application. The router never
    /// installs a subscriber itself; callers pass `env_filter()` to theirs.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            service_name: None,
            metrics_enabled: default_metrics_enabled(),
            log_level: default_log_level(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

/// A raw representation of the config file before validation.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    router: RouterConfig,
}

impl RouterConfig {
    /// Creates a new `RouterConfig` by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        let config = Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid router configuration in '{path}'"))?;
        info!("Loaded router configuration from {}", path);
        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(contents).context("Failed to parse TOML")?;
        raw.router.validate()?;
        Ok(raw.router)
    }

    /// Validates the configuration to ensure logical consistency.
    fn validate(&self) -> Result<()> {
        if let Some(name) = &self.service_name {
            if name.trim().is_empty() {
                return Err(anyhow!("router.service_name cannot be empty"));
            }
            if name.chars().any(char::is_whitespace) {
                return Err(anyhow!(
                    "router.service_name '{name}' cannot contain whitespace"
                ));
            }
        }
        self.env_filter()?;
        Ok(())
    }

    /// Builds a tracing filter from `log_level`.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.log_level)
            .map_err(|e| anyhow!("invalid router.log_level '{}': {e}", self.log_level))
    }
}
