//! Application services
//!
//! - `trait_extraction` / `trait_aggregator`: per-source traits, batched with retry
//! - `embedding_submitter`: one-shot embedding submission
//! - `matching_pipeline`: aggregate, merge and submit with step-scoped failures
//! - `status_synchronizer` / `poll_scheduler`: the matching state machine and its poller

pub mod embedding_submitter;
pub mod matching_pipeline;
pub mod poll_scheduler;
pub mod status_synchronizer;
pub mod trait_aggregator;
pub mod trait_extraction;
pub mod wait_time;

pub use embedding_submitter::{EmbeddingSubmitter, SubmissionError};
pub use matching_pipeline::{MatchingPipeline, PipelineReport, PipelineStep, StepFailure};
pub use poll_scheduler::{PollHandle, PollScheduler, PollStatus};
pub use status_synchronizer::{
    derive_ui_status, wait_time_minutes, StatusSynchronizer, SyncConfig, SyncError,
};
pub use trait_aggregator::{AggregationError, TraitAggregator};
pub use trait_extraction::{ExtractionStrategy, RosterEntry, RosterMatch};
pub use wait_time::format_wait_time;
