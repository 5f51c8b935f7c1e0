//! Wiring: pick the gateway and record store once, build the services.
//!
//! - `mock_mode_enabled`: simulator gateway and demo in-memory records
//! - otherwise: live gateway behind the fallback decorator, HTTP records

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::adapters::records::InMemoryRecordStore;
use crate::adapters::simulator::SimulatedGateway;
use crate::domain::models::Config;
use crate::domain::ports::{Clock, IdentityProvider, MatchGateway, RecordStore, SystemClock};
use crate::infrastructure::backend::{
    BackendClientConfig, FallbackGateway, HttpRecordStore, LiveMatchGateway,
};
use crate::infrastructure::identity::identity_from_config;
use crate::services::{
    EmbeddingSubmitter, MatchingPipeline, StatusSynchronizer, SyncConfig, TraitAggregator,
};

impl From<&Config> for BackendClientConfig {
    fn from(config: &Config) -> Self {
        Self {
            base_url: config.backend_base_url.trim_end_matches('/').to_string(),
            rpc_timeout: config.rpc_timeout(),
        }
    }
}

/// Select the gateway strategy for this process.
pub fn build_gateway(config: &Config, clock: Arc<dyn Clock>) -> Result<Arc<dyn MatchGateway>> {
    let simulator: Arc<dyn MatchGateway> =
        Arc::new(SimulatedGateway::new(config.simulator.clone(), clock));

    if config.mock_mode_enabled {
        info!("mock mode enabled, using simulated backend");
        return Ok(simulator);
    }

    let live = LiveMatchGateway::new(BackendClientConfig::from(config))
        .context("Failed to create matching backend client")?;
    Ok(Arc::new(FallbackGateway::new(Arc::new(live), simulator)))
}

/// Select the record store for this process.
pub fn build_record_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    if config.mock_mode_enabled {
        return Ok(Arc::new(InMemoryRecordStore::with_demo_sources()));
    }

    let store = HttpRecordStore::new(&BackendClientConfig::from(config))
        .context("Failed to create record store client")?;
    Ok(Arc::new(store))
}

/// Everything the CLI needs, built from one configuration.
pub struct Services {
    pub config: Config,
    pub identity: Arc<dyn IdentityProvider>,
    pub gateway: Arc<dyn MatchGateway>,
    pub synchronizer: Arc<StatusSynchronizer>,
    pub pipeline: MatchingPipeline,
}

impl Services {
    pub fn build(config: Config) -> Result<Self> {
        Self::build_with_clock(config, Arc::new(SystemClock))
    }

    pub fn build_with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let identity = identity_from_config(&config.identity);
        let gateway = build_gateway(&config, clock.clone())?;
        let store = build_record_store(&config)?;

        let synchronizer = Arc::new(StatusSynchronizer::new(
            gateway.clone(),
            identity.clone(),
            clock,
            SyncConfig::from_config(&config),
        ));

        let aggregator = Arc::new(TraitAggregator::new(store, &config.aggregation));
        let submitter = Arc::new(EmbeddingSubmitter::new(gateway.clone()));
        let pipeline = MatchingPipeline::new(aggregator, submitter);

        Ok(Self {
            config,
            identity,
            gateway,
            synchronizer,
            pipeline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_mode_uses_simulator() {
        let config = Config {
            mock_mode_enabled: true,
            ..Config::default()
        };
        let gateway = build_gateway(&config, Arc::new(SystemClock)).unwrap();
        assert_eq!(gateway.name(), "simulated");
    }

    #[test]
    fn test_live_mode_wraps_in_fallback() {
        let gateway = build_gateway(&Config::default(), Arc::new(SystemClock)).unwrap();
        assert_eq!(gateway.name(), "fallback");
    }

    #[test]
    fn test_backend_config_trims_trailing_slash() {
        let config = Config {
            backend_base_url: "http://backend:7350/".to_string(),
            ..Config::default()
        };
        assert_eq!(BackendClientConfig::from(&config).base_url, "http://backend:7350");
    }
}
