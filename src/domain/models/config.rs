use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for kindred
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Answer every backend call from the journey simulator
    #[serde(default)]
    pub mock_mode_enabled: bool,

    /// Base URL of the matching backend
    #[serde(default = "default_backend_base_url")]
    pub backend_base_url: String,

    /// Per-call timeout for backend RPCs
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,

    /// Refresh target while waiting for a cycle
    #[serde(default = "default_refresh_interval_waiting_ms")]
    pub refresh_interval_waiting_ms: u64,

    /// Refresh target for every other state
    #[serde(default = "default_refresh_interval_default_ms")]
    pub refresh_interval_default_ms: u64,

    /// Cadence at which the poll loop checks whether a refresh is due
    #[serde(default = "default_poll_tick_ms")]
    pub poll_tick_ms: u64,

    /// How long after opt-in a queued user is shown as processing
    #[serde(default = "default_processing_window_secs")]
    pub processing_window_secs: u64,

    /// Trait aggregation settings
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Journey simulator settings
    #[serde(default)]
    pub simulator: SimulatorConfig,

    /// Identity settings
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_backend_base_url() -> String {
    "http://127.0.0.1:7350".to_string()
}

const fn default_rpc_timeout_ms() -> u64 {
    5_000
}

const fn default_refresh_interval_waiting_ms() -> u64 {
    30_000
}

const fn default_refresh_interval_default_ms() -> u64 {
    120_000
}

const fn default_poll_tick_ms() -> u64 {
    5_000
}

const fn default_processing_window_secs() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mock_mode_enabled: false,
            backend_base_url: default_backend_base_url(),
            rpc_timeout_ms: default_rpc_timeout_ms(),
            refresh_interval_waiting_ms: default_refresh_interval_waiting_ms(),
            refresh_interval_default_ms: default_refresh_interval_default_ms(),
            poll_tick_ms: default_poll_tick_ms(),
            processing_window_secs: default_processing_window_secs(),
            aggregation: AggregationConfig::default(),
            simulator: SimulatorConfig::default(),
            identity: IdentityConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn poll_tick(&self) -> Duration {
        Duration::from_millis(self.poll_tick_ms)
    }
}

/// Trait aggregation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AggregationConfig {
    /// Sources fetched concurrently per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Total attempts per record fetch, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Factor applied to the delay after each retry
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: u32,

    /// Upper bound on a single delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_batch_size() -> usize {
    5
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1_000
}

const fn default_backoff_multiplier() -> u32 {
    2
}

const fn default_max_backoff_ms() -> u64 {
    8_000
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Journey simulator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SimulatorConfig {
    /// Lower bound of the artificial latency in milliseconds
    #[serde(default)]
    pub min_latency_ms: u64,

    /// Upper bound of the artificial latency in milliseconds
    #[serde(default)]
    pub max_latency_ms: u64,

    /// Auto-advance waiting journeys to matched
    #[serde(default = "default_true")]
    pub journey_enabled: bool,

    /// Time spent waiting before a journey flips to matched
    #[serde(default = "default_waiting_duration_secs")]
    pub waiting_duration_secs: u64,

    /// Score reported for simulated matches
    #[serde(default = "default_match_score")]
    pub match_score: f64,

    /// Dimension reported for simulated embeddings
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    /// Whether simulated users may participate
    #[serde(default = "default_true")]
    pub can_participate: bool,

    /// Seed for latency sampling and error injection
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Random error injection
    #[serde(default)]
    pub errors: ErrorInjectionConfig,
}

const fn default_true() -> bool {
    true
}

const fn default_waiting_duration_secs() -> u64 {
    300
}

const fn default_match_score() -> f64 {
    0.87
}

const fn default_embedding_dimension() -> usize {
    384
}

const fn default_seed() -> u64 {
    0x6b69_6e64
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            min_latency_ms: 0,
            max_latency_ms: 0,
            journey_enabled: true,
            waiting_duration_secs: default_waiting_duration_secs(),
            match_score: default_match_score(),
            embedding_dimension: default_embedding_dimension(),
            can_participate: true,
            seed: default_seed(),
            errors: ErrorInjectionConfig::default(),
        }
    }
}

impl SimulatorConfig {
    pub fn waiting_duration(&self) -> Duration {
        Duration::from_secs(self.waiting_duration_secs)
    }
}

/// Random error injection for the simulator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ErrorInjectionConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Probability in `[0, 1]` that a call fails
    #[serde(default)]
    pub probability: f64,

    #[serde(default = "default_true")]
    pub network: bool,

    #[serde(default = "default_true")]
    pub client: bool,

    #[serde(default = "default_true")]
    pub server: bool,
}

impl Default for ErrorInjectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            probability: 0.0,
            network: true,
            client: true,
            server: true,
        }
    }
}

/// Identity configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IdentityConfig {
    /// Global user identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Display name used in conversation rosters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Session token (can also be set via `KINDRED_IDENTITY__TOKEN`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// File caching the current user identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_file: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stdout only when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}
