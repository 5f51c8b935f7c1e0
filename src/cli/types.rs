//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kindred")]
#[command(about = "Kindred - matching lifecycle client", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .kindred/config.yaml)
    #[arg(short, long, global = true, env = "KINDRED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Answer every backend call from the journey simulator
    #[arg(long, global = true)]
    pub mock: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synchronize once and show the matching state
    Status,

    /// Enter the matching queue
    OptIn,

    /// Leave the matching queue
    OptOut,

    /// Keep polling and print every state change until interrupted
    Watch {
        /// Poll tick in seconds (defaults to poll_tick_ms)
        #[arg(long)]
        tick_secs: Option<u64>,
    },

    /// Aggregate traits from conversation sources and submit them for embedding
    Pipeline {
        /// Conversation source id (repeatable)
        #[arg(short, long = "source", required = true)]
        sources: Vec<String>,
    },

    /// Show users with similar trait embeddings
    Similar {
        /// Number of users to return
        #[arg(short = 'k', long, default_value = "10")]
        top_k: usize,

        /// Include raw embedding vectors
        #[arg(long)]
        vectors: bool,
    },

    /// Print the effective configuration
    Config,
}
