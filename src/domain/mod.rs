//! Domain layer for the kindred matching client
//!
//! This module contains the matching records, the derived UI state, and the
//! port traits the services are written against.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
