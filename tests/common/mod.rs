//! Common test utilities for integration tests
//!
//! Provides a scripted matching gateway with per-operation call counters,
//! plus fixtures for sessions, matches and synchronizers.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use kindred::domain::models::{
    EmbeddingAck, MatchPair, MatchingStatus, OptInData, OptInResponse, Session, SimilarUser,
    SimilarUsers, UserAggregatedTraits,
};
use kindred::domain::ports::{
    Clock, ErrorCode, GatewayError, GatewayResult, ManualClock, MatchGateway,
};
use kindred::infrastructure::identity::StaticIdentity;
use kindred::services::{StatusSynchronizer, SyncConfig};

pub const USER_ID: &str = "user-me";
pub const PARTNER_ID: &str = "user-partner";

/// Failure to inject into scripted calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Network,
    BadRequest,
    Unavailable,
    RateLimited,
}

impl Fault {
    pub fn error(self) -> GatewayError {
        match self {
            Self::Network => GatewayError::Network("connection refused".to_string()),
            Self::BadRequest => GatewayError::from_status(400, "bad request"),
            Self::Unavailable => {
                GatewayError::coded(503, ErrorCode::ServiceUnavailable, "down for maintenance")
            }
            Self::RateLimited => GatewayError::coded(429, ErrorCode::RateLimited, "slow down"),
        }
    }
}

/// What the scripted backend answers.
#[derive(Debug, Clone)]
pub struct Script {
    pub can_participate: bool,
    pub status: Option<MatchingStatus>,
    pub current_match: Option<MatchPair>,
    pub traits: Option<UserAggregatedTraits>,
    pub opt_in_success: bool,
    pub opt_out_success: bool,
    /// Applied to every call
    pub fault: Option<Fault>,
    /// Applied to opt-in only
    pub opt_in_fault: Option<Fault>,
    pub embedding_dimension: usize,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            can_participate: true,
            status: Some(MatchingStatus::idle()),
            current_match: None,
            traits: Some(traits("kind, curious")),
            opt_in_success: true,
            opt_out_success: true,
            fault: None,
            opt_in_fault: None,
            embedding_dimension: 384,
        }
    }
}

/// A gateway that answers from a mutable [`Script`] and counts calls.
///
/// A successful opt-in flips the scripted status to seeking at the clock's
/// current time, and a successful opt-out back to idle, like the backend.
pub struct ScriptedGateway {
    script: Mutex<Script>,
    calls: Mutex<HashMap<&'static str, u32>>,
    clock: Arc<ManualClock>,
}

impl ScriptedGateway {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self::with_script(clock, Script::default())
    }

    pub fn with_script(clock: Arc<ManualClock>, script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            calls: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn update(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.script.lock().unwrap());
    }

    pub fn calls(&self, op: &str) -> u32 {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    fn enter(&self, op: &'static str) -> GatewayResult<Script> {
        *self.calls.lock().unwrap().entry(op).or_insert(0) += 1;
        let script = self.script.lock().unwrap().clone();
        match script.fault {
            Some(fault) => Err(fault.error()),
            None => Ok(script),
        }
    }
}

#[async_trait]
impl MatchGateway for ScriptedGateway {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn can_participate(&self, session: &Session) -> GatewayResult<bool> {
        if !session.has_identity() {
            return Ok(false);
        }
        Ok(self.enter("can_participate")?.can_participate)
    }

    async fn get_status(&self, _session: &Session) -> GatewayResult<Option<MatchingStatus>> {
        Ok(self.enter("get_status")?.status)
    }

    async fn opt_in(&self, _session: &Session) -> GatewayResult<Option<OptInResponse>> {
        let script = self.enter("opt_in")?;
        if let Some(fault) = script.opt_in_fault {
            return Err(fault.error());
        }
        if !script.opt_in_success {
            return Ok(Some(OptInResponse {
                success: false,
                status: Some("rejected".to_string()),
                message: Some("not allowed".to_string()),
                data: OptInData::default(),
            }));
        }

        let status = MatchingStatus::seeking(self.clock.now());
        self.update(|s| s.status = Some(status.clone()));
        Ok(Some(OptInResponse {
            success: true,
            status: Some("waiting".to_string()),
            message: None,
            data: OptInData {
                matching_status: Some(status),
            },
        }))
    }

    async fn opt_out(&self, _session: &Session) -> GatewayResult<bool> {
        let script = self.enter("opt_out")?;
        if script.opt_out_success {
            self.update(|s| {
                s.status = Some(MatchingStatus::idle());
                s.current_match = None;
            });
        }
        Ok(script.opt_out_success)
    }

    async fn get_current_match(&self, _session: &Session) -> GatewayResult<Option<MatchPair>> {
        Ok(self.enter("get_current_match")?.current_match)
    }

    async fn get_user_traits(
        &self,
        _session: &Session,
    ) -> GatewayResult<Option<UserAggregatedTraits>> {
        Ok(self.enter("get_user_traits")?.traits)
    }

    async fn generate_match_embeddings(
        &self,
        _session: &Session,
        _traits: &[String],
    ) -> GatewayResult<EmbeddingAck> {
        let script = self.enter("generate_match_embeddings")?;
        Ok(EmbeddingAck {
            embedding_dimension: script.embedding_dimension,
            success: true,
        })
    }

    async fn find_similar_users(
        &self,
        _session: &Session,
        top_k: usize,
        _include_vectors: bool,
    ) -> GatewayResult<SimilarUsers> {
        self.enter("find_similar_users")?;
        let similar_users: Vec<SimilarUser> = (0..top_k)
            .map(|i| SimilarUser {
                user_id: format!("similar-{i}"),
                score: 0.5,
                metadata: serde_json::Value::Null,
                vector: None,
            })
            .collect();
        Ok(SimilarUsers {
            count: similar_users.len(),
            similar_users,
        })
    }
}

pub fn session() -> Session {
    Session::new(USER_ID).with_username("Sam")
}

pub fn traits(descriptor: &str) -> UserAggregatedTraits {
    UserAggregatedTraits {
        global_user_id: USER_ID.to_string(),
        traits: descriptor.to_string(),
        last_updated: Utc::now(),
    }
}

pub fn match_pair(score: f64) -> MatchPair {
    MatchPair {
        user1_id: USER_ID.to_string(),
        user2_id: PARTNER_ID.to_string(),
        score,
        cycle_id: "cycle-7".to_string(),
        channel_id: "channel-7".to_string(),
        created_at: Utc::now(),
    }
}

/// Synchronizer over `gateway` for the default session.
pub fn synchronizer(
    gateway: Arc<dyn MatchGateway>,
    clock: Arc<ManualClock>,
) -> StatusSynchronizer {
    StatusSynchronizer::new(
        gateway,
        Arc::new(StaticIdentity::new(session())),
        clock,
        SyncConfig::default(),
    )
}

/// Synchronizer with no identity at all.
pub fn anonymous_synchronizer(
    gateway: Arc<dyn MatchGateway>,
    clock: Arc<ManualClock>,
) -> StatusSynchronizer {
    StatusSynchronizer::new(
        gateway,
        Arc::new(StaticIdentity::anonymous()),
        clock,
        SyncConfig::default(),
    )
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
