//! Adapters that stand in for external systems.

pub mod records;
pub mod simulator;
