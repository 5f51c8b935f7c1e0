//! Record store adapters that do not need a backend.

pub mod memory;

pub use memory::{FailureKind, InMemoryRecordStore};
