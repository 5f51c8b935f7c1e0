use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("backend_base_url cannot be empty unless mock_mode_enabled is set")]
    EmptyBackendUrl,

    #[error("Invalid {0}: must be greater than 0")]
    ZeroDuration(&'static str),

    #[error("Invalid batch_size: {0}. Must be at least 1")]
    InvalidBatchSize(usize),

    #[error("Invalid max_attempts: {0}. Cannot be 0")]
    InvalidMaxAttempts(u32),

    #[error("Invalid backoff_multiplier: {0}. Must be at least 1")]
    InvalidBackoffMultiplier(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid simulator latency: min_latency_ms ({0}) exceeds max_latency_ms ({1})")]
    InvalidLatencyRange(u64, u64),

    #[error("Invalid error probability: {0}. Must be between 0 and 1")]
    InvalidErrorProbability(f64),

    #[error("Invalid match score: {0}. Must be between 0 and 1")]
    InvalidMatchScore(f64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .kindred/config.yaml (project config)
    /// 3. .kindred/local.yaml (local overrides, optional)
    /// 4. Environment variables (KINDRED_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".kindred/config.yaml"))
            .merge(Yaml::file(".kindred/local.yaml"))
            .merge(Env::prefixed("KINDRED_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring environment overrides
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("KINDRED_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if !config.mock_mode_enabled && config.backend_base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBackendUrl);
        }

        for (name, value) in [
            ("rpc_timeout_ms", config.rpc_timeout_ms),
            ("refresh_interval_waiting_ms", config.refresh_interval_waiting_ms),
            ("refresh_interval_default_ms", config.refresh_interval_default_ms),
            ("poll_tick_ms", config.poll_tick_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroDuration(name));
            }
        }

        let aggregation = &config.aggregation;
        if aggregation.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(aggregation.batch_size));
        }
        if aggregation.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(aggregation.max_attempts));
        }
        if aggregation.backoff_multiplier == 0 {
            return Err(ConfigError::InvalidBackoffMultiplier(
                aggregation.backoff_multiplier,
            ));
        }
        if aggregation.initial_backoff_ms > aggregation.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                aggregation.initial_backoff_ms,
                aggregation.max_backoff_ms,
            ));
        }

        let simulator = &config.simulator;
        if simulator.min_latency_ms > simulator.max_latency_ms {
            return Err(ConfigError::InvalidLatencyRange(
                simulator.min_latency_ms,
                simulator.max_latency_ms,
            ));
        }
        if !(0.0..=1.0).contains(&simulator.errors.probability) {
            return Err(ConfigError::InvalidErrorProbability(
                simulator.errors.probability,
            ));
        }
        if !(0.0..=1.0).contains(&simulator.match_score) {
            return Err(ConfigError::InvalidMatchScore(simulator.match_score));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
