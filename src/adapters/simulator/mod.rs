//! Journey simulator
//!
//! A deterministic, time-aware fake of the matching backend. Used directly in
//! mock mode, as the fallback behind the live gateway, and in tests.

pub mod gateway;
pub mod journey;

pub use gateway::{ForceStateOptions, SimulatedGateway, SIMULATED_PARTNER_ID};
pub use journey::{JourneyPhase, JourneyState};
