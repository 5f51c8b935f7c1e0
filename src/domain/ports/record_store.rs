//! Object-record fetch port used by trait aggregation.

use async_trait::async_trait;
use std::fmt;

use super::errors::{GatewayError, GatewayResult};
use crate::domain::models::Session;

/// Which per-conversation record to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordPath {
    /// Conversation roster
    Participants,
    /// Personality / trait analysis
    Personality,
}

impl RecordPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Participants => "participants",
            Self::Personality => "personality",
        }
    }
}

impl fmt::Display for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fetched record: already-decoded JSON or raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordPayload {
    Json(serde_json::Value),
    Raw(Vec<u8>),
}

impl RecordPayload {
    /// Decode into JSON, parsing raw bytes if needed.
    pub fn into_json(self) -> GatewayResult<serde_json::Value> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Raw(bytes) => serde_json::from_slice(&bytes).map_err(GatewayError::from),
        }
    }
}

/// Read-only access to per-conversation records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch(
        &self,
        session: &Session,
        path: RecordPath,
        record_id: &str,
    ) -> GatewayResult<RecordPayload>;
}
