//! Kindred - matching lifecycle client
//!
//! Keeps a client's view of the server-owned matching process correct and
//! live, and builds the trait data that makes a user eligible for it.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Matching records, derived UI state, port traits
//! - **Service Layer** (`services`): Status synchronization, polling, trait aggregation
//!   and embedding submission
//! - **Infrastructure Layer** (`infrastructure`): Backend client, configuration,
//!   logging, identity and wiring
//! - **Adapters** (`adapters`): Journey simulator and in-memory record store
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use kindred::infrastructure::setup::Services;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let services = Services::build(kindred::Config::default())?;
//!     let state = services.synchronizer.refresh().await?;
//!     println!("{state}");
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Config, MatchPair, MatchingStatus, Session, SyncSnapshot, TraitRecord, UiMatchingStatus,
    UserAggregatedTraits,
};
pub use domain::ports::{Clock, GatewayError, IdentityProvider, MatchGateway, RecordStore};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    MatchingPipeline, PollScheduler, StatusSynchronizer, StepFailure, TraitAggregator,
};
