//! Infrastructure layer module
//!
//! This module contains the infrastructure adapters and external integrations:
//! - Matching backend client, retry policy and fallback decorator
//! - Configuration management
//! - Logging infrastructure
//! - Identity providers
//! - Service wiring
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod backend;
pub mod config;
pub mod identity;
pub mod logging;
pub mod setup;
