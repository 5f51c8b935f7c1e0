//! Matching backend integration
//!
//! Provides the live RPC client with:
//! - Bounded per-call timeouts
//! - Failure classification (transient vs permanent, user-facing messages)
//! - Exponential backoff retry for record fetches
//! - A fallback decorator that answers retryable failures from the simulator

pub mod classifier;
pub mod client;
pub mod fallback;
pub mod records;
pub mod retry;

pub use classifier::{Classification, ErrorClassifier};
pub use client::{BackendClientConfig, LiveMatchGateway};
pub use fallback::FallbackGateway;
pub use records::HttpRecordStore;
pub use retry::RetryPolicy;
