//! Command-line interface.

pub mod commands;
pub mod output;
pub mod types;

pub use output::handle_error;
pub use types::{Cli, Commands};

use anyhow::Result;
use std::time::Duration;

use crate::infrastructure::setup::Services;

/// Run one parsed command against built services.
pub async fn dispatch(command: Commands, services: &Services, json: bool) -> Result<()> {
    match command {
        Commands::Status => commands::status::status(services, json).await,
        Commands::OptIn => commands::status::opt_in(services, json).await,
        Commands::OptOut => commands::status::opt_out(services, json).await,
        Commands::Watch { tick_secs } => {
            commands::status::watch(services, tick_secs.map(|s| Duration::from_secs(s.max(1))), json).await
        }
        Commands::Pipeline { sources } => commands::pipeline::execute(services, sources, json).await,
        Commands::Similar { top_k, vectors } => {
            commands::similar::execute(services, top_k, vectors, json).await
        }
        Commands::Config => commands::config::execute(&services.config, json),
    }
}
