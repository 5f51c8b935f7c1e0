//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces that infrastructure adapters must implement:
//! - MatchGateway: Matching backend RPC surface
//! - RecordStore: Per-conversation record fetch
//! - IdentityProvider: Current user session
//! - Clock: Wall-clock time
//!
//! These traits keep the synchronization and aggregation services
//! independent of transport and of the simulator.

pub mod clock;
pub mod errors;
pub mod identity;
pub mod match_gateway;
pub mod record_store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{ErrorCode, GatewayError, GatewayResult};
pub use identity::IdentityProvider;
pub use match_gateway::MatchGateway;
pub use record_store::{RecordPath, RecordPayload, RecordStore};
