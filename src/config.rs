//! Configuration management for the Backbeat relayer
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub engine: EngineConfig,
    pub contracts: ContractsConfig,
    pub supervision: SupervisionConfig,
    pub purchase: PurchaseConfig,
    pub simple_retry: SimpleRetryConfig,
    pub api: ApiConfig,
    pub metrics: MetricsConfig,
}

/// Execution engine endpoint and credentials
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub base_url: String,
    pub access_token: String,
    /// Backend wallet the engine signs admin operations with
    pub admin_wallet: String,
    /// Chain identifier the engine routes submissions to
    pub chain: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// On-chain contract addresses the game operates against
#[derive(Debug, Clone, Deserialize)]
pub struct ContractsConfig {
    pub game_token: String,
    pub card_marketplace: String,
    pub card_upgrade_marketplace: String,
    pub pack_marketplace: String,
    pub soul: String,
    pub misc_items: String,
    pub edition: String,
}

/// Foreground and background confirmation budgets
#[derive(Debug, Clone, Deserialize)]
pub struct SupervisionConfig {
    #[serde(default = "default_max_immediate_retries")]
    pub max_immediate_retries: u32,
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    #[serde(default = "default_max_error_retries")]
    pub max_error_retries: u32,
    #[serde(default = "default_max_background_retries")]
    pub max_background_retries: u32,
    #[serde(default = "default_background_retry_interval_ms")]
    pub background_retry_interval_ms: u64,
}

/// Multi-step purchase attempt policy
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_interval_ms")]
    pub retry_delay_ms: u64,
}

/// One-shot submission retry policy for reward/asset wrappers
#[derive(Debug, Clone, Deserialize)]
pub struct SimpleRetryConfig {
    #[serde(default = "default_simple_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_simple_delay_ms")]
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_immediate_retries() -> u32 {
    3
}

fn default_retry_interval_ms() -> u64 {
    3_000
}

fn default_max_error_retries() -> u32 {
    5
}

fn default_max_background_retries() -> u32 {
    10
}

fn default_background_retry_interval_ms() -> u64 {
    5_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_simple_max_retries() -> u32 {
    3
}

fn default_simple_delay_ms() -> u64 {
    1_000
}

impl Settings {
    /// Load settings from configuration files
    pub fn load() -> Result<Self> {
        let config_path = env::var("BACKBEAT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        // Substitute environment variables
        let config_str = substitute_env_vars(&config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.engine.base_url.is_empty() {
            anyhow::bail!("engine.base_url must be configured");
        }
        if self.engine.admin_wallet.is_empty() {
            anyhow::bail!("engine.admin_wallet must be configured");
        }
        if self.supervision.max_immediate_retries == 0 {
            anyhow::bail!("supervision.max_immediate_retries must be at least 1");
        }
        if self.purchase.max_attempts == 0 {
            anyhow::bail!("purchase.max_attempts must be at least 1");
        }
        if self.engine.access_token.is_empty() {
            tracing::warn!("engine.access_token is empty - engine calls will be unauthenticated");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.engine.request_timeout_ms)
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_substitution() {
        env::set_var("BACKBEAT_TEST_VAR", "sk_test");
        let input = "access_token = \"${BACKBEAT_TEST_VAR}\"";
        let result = substitute_env_vars(input);
        assert_eq!(result, "access_token = \"sk_test\"");
    }

    #[test]
    fn test_supervision_defaults() {
        let cfg: SupervisionConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.max_immediate_retries, 3);
        assert_eq!(cfg.retry_interval_ms, 3_000);
        assert_eq!(cfg.max_error_retries, 5);
        assert_eq!(cfg.max_background_retries, 10);
        assert_eq!(cfg.background_retry_interval_ms, 5_000);
    }
}
