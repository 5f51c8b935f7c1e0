//! Effective configuration dump.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    #[serde(flatten)]
    pub config: Config,
}

impl ConfigOutput {
    pub fn redacted(mut config: Config) -> Self {
        if config.identity.token.is_some() {
            config.identity.token = Some("[REDACTED]".to_string());
        }
        Self { config }
    }
}

impl CommandOutput for ConfigOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config).unwrap_or_default()
    }
}

pub fn execute(config: &Config, json: bool) -> Result<()> {
    output(&ConfigOutput::redacted(config.clone()), json);
    Ok(())
}
