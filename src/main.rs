//! Kindred CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;

use kindred::cli::{dispatch, handle_error, Cli};
use kindred::infrastructure::config::ConfigLoader;
use kindred::infrastructure::logging::{LogConfig, LoggerImpl};
use kindred::infrastructure::setup::Services;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(err, json);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    if cli.mock {
        config.mock_mode_enabled = true;
    }

    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging))
        .context("Failed to initialize logging")?;

    let services = Services::build(config)?;
    dispatch(cli.command, &services, cli.json).await
}
