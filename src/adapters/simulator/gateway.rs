//! Simulated matching backend for development and testing.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::journey::{JourneyPhase, JourneyState};
use crate::domain::models::{
    traits_descriptor, EmbeddingAck, MatchPair, MatchingStatus, OptInData, OptInResponse,
    Session, SimilarUser, SimilarUsers, SimulatorConfig, UserAggregatedTraits,
};
use crate::domain::ports::{Clock, ErrorCode, GatewayError, GatewayResult, MatchGateway};

/// Partner id reported for simulated matches.
pub const SIMULATED_PARTNER_ID: &str = "sim-partner-001";

const CANNED_TRAITS: &str = "curious, warm, direct, playful";

/// Options for [`SimulatedGateway::force_state`].
#[derive(Debug, Clone, Default)]
pub struct ForceStateOptions {
    /// How long the journey has already been in the forced phase
    pub time_in_state: Duration,
    /// Score reported for the match, when forcing `Matched`
    pub match_score: Option<f64>,
}

#[derive(Debug)]
struct SimState {
    journey: JourneyState,
    match_score: f64,
    cycle_seq: u64,
    channel_id: Option<String>,
    traits: Option<UserAggregatedTraits>,
}

impl SimState {
    fn new(now: DateTime<Utc>, match_score: f64) -> Self {
        Self {
            journey: JourneyState::new(now),
            match_score,
            cycle_seq: 0,
            channel_id: None,
            traits: None,
        }
    }

    fn enter_matched(&mut self, at: DateTime<Utc>) {
        self.journey.begin_matched(at);
        self.cycle_seq += 1;
        self.channel_id = Some(Uuid::new_v4().to_string());
    }

    fn cycle_id(&self) -> String {
        format!("sim-cycle-{}", self.cycle_seq)
    }
}

#[derive(Debug, Clone, Copy)]
enum InjectedFault {
    Network,
    Client,
    Server,
}

/// Deterministic fake of the matching backend.
///
/// Journey state is scoped to one simulator instance; `reset()` returns it
/// to its initial values so test cases never leak into each other.
pub struct SimulatedGateway {
    config: SimulatorConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<SimState>,
    rng: Mutex<StdRng>,
    calls: AtomicU64,
}

impl SimulatedGateway {
    /// A latency range given upside down collapses to `min_latency_ms`.
    pub fn new(mut config: SimulatorConfig, clock: Arc<dyn Clock>) -> Self {
        config.max_latency_ms = config.max_latency_ms.max(config.min_latency_ms);
        let now = clock.now();
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            state: Mutex::new(SimState::new(now, config.match_score)),
            rng: Mutex::new(rng),
            calls: AtomicU64::new(0),
            config,
            clock,
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the journey state.
    pub fn journey_state(&self) -> JourneyState {
        self.state().journey.clone()
    }

    /// Number of gateway operations served so far.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Return to the initial journey, forgetting submitted traits.
    pub fn reset(&self) {
        let now = self.clock.now();
        *self.state() = SimState::new(now, self.config.match_score);
        *self.rng.lock().unwrap_or_else(PoisonError::into_inner) =
            StdRng::seed_from_u64(self.config.seed);
        self.calls.store(0, Ordering::SeqCst);
    }

    /// Jump to `phase`, back-dating timestamps by `time_in_state`.
    pub fn force_state(&self, phase: JourneyPhase, options: ForceStateOptions) {
        let now = self.clock.now();
        let elapsed = ChronoDuration::from_std(options.time_in_state).unwrap_or(ChronoDuration::zero());
        let entered = now - elapsed;

        let mut state = self.state();
        if let Some(score) = options.match_score {
            state.match_score = score.clamp(0.0, 1.0);
        }

        match phase {
            JourneyPhase::New => {
                state.journey = JourneyState::new(entered);
                state.channel_id = None;
            }
            JourneyPhase::Waiting => {
                state.journey.begin_waiting(entered);
                state.channel_id = None;
            }
            JourneyPhase::Matched => {
                let waiting = ChronoDuration::from_std(self.config.waiting_duration())
                    .unwrap_or(ChronoDuration::zero());
                state.journey.begin_waiting(entered - waiting);
                state.enter_matched(entered);
            }
        }
        debug!(?phase, time_in_state_ms = options.time_in_state.as_millis() as u64, "forced journey state");
    }

    /// Latency and random fault injection shared by every operation.
    async fn simulate_call(&self, op: &'static str) -> GatewayResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let (latency, fault) = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            let latency = if self.config.max_latency_ms > 0 {
                rng.gen_range(self.config.min_latency_ms..=self.config.max_latency_ms)
            } else {
                0
            };
            (latency, self.pick_fault(&mut rng))
        };

        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        match fault {
            None => Ok(()),
            Some(fault) => {
                debug!(op, ?fault, "injecting simulated failure");
                Err(match fault {
                    InjectedFault::Network => {
                        GatewayError::Network("simulated connection reset".to_string())
                    }
                    InjectedFault::Client => GatewayError::from_status(400, "simulated bad request"),
                    InjectedFault::Server => GatewayError::coded(
                        503,
                        ErrorCode::ServiceUnavailable,
                        "simulated outage",
                    ),
                })
            }
        }
    }

    fn pick_fault(&self, rng: &mut StdRng) -> Option<InjectedFault> {
        let errors = &self.config.errors;
        if !errors.enabled || errors.probability <= 0.0 {
            return None;
        }

        let categories: Vec<InjectedFault> = [
            (errors.network, InjectedFault::Network),
            (errors.client, InjectedFault::Client),
            (errors.server, InjectedFault::Server),
        ]
        .into_iter()
        .filter_map(|(enabled, fault)| enabled.then_some(fault))
        .collect();

        if categories.is_empty() || !rng.gen_bool(errors.probability.clamp(0.0, 1.0)) {
            return None;
        }
        Some(categories[rng.gen_range(0..categories.len())])
    }

    /// Apply time-driven transitions, then hand out the state.
    fn advanced_state(&self) -> MutexGuard<'_, SimState> {
        let now = self.clock.now();
        let mut state = self.state();
        if self.config.journey_enabled && state.journey.advance(now, self.config.waiting_duration()) {
            state.cycle_seq += 1;
            state.channel_id = Some(Uuid::new_v4().to_string());
            debug!("simulated journey advanced to matched");
        }
        state
    }

    fn status_for(state: &SimState) -> MatchingStatus {
        match state.journey.current_state {
            JourneyPhase::New => MatchingStatus::idle(),
            JourneyPhase::Waiting => MatchingStatus::seeking(
                state
                    .journey
                    .processing_started_at
                    .unwrap_or(state.journey.entered_state_at),
            ),
            JourneyPhase::Matched => MatchingStatus {
                is_seeking_match: false,
                opt_in_timestamp: state.journey.processing_started_at,
                has_never_opted_in: Some(false),
                last_matched_cycle_id: Some(state.cycle_id()),
                current_match_partner_id: Some(SIMULATED_PARTNER_ID.to_string()),
                missed_cycles_count: 0,
            },
        }
    }
}

#[async_trait]
impl MatchGateway for SimulatedGateway {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn can_participate(&self, session: &Session) -> GatewayResult<bool> {
        if !session.has_identity() {
            return Ok(false);
        }
        self.simulate_call("can_participate").await?;
        Ok(self.config.can_participate)
    }

    async fn get_status(&self, _session: &Session) -> GatewayResult<Option<MatchingStatus>> {
        self.simulate_call("get_status").await?;
        let state = self.advanced_state();
        Ok(Some(Self::status_for(&state)))
    }

    async fn opt_in(&self, _session: &Session) -> GatewayResult<Option<OptInResponse>> {
        self.simulate_call("opt_in").await?;
        let now = self.clock.now();
        let mut state = self.advanced_state();

        let (success, message) = match state.journey.current_state {
            JourneyPhase::New => {
                state.journey.begin_waiting(now);
                (true, "Opted in to matching")
            }
            JourneyPhase::Waiting => (true, "Already seeking a match"),
            JourneyPhase::Matched => (false, "Already matched for this cycle"),
        };

        Ok(Some(OptInResponse {
            success,
            status: Some(if success { "waiting" } else { "matched" }.to_string()),
            message: Some(message.to_string()),
            data: OptInData {
                matching_status: Some(Self::status_for(&state)),
            },
        }))
    }

    async fn opt_out(&self, _session: &Session) -> GatewayResult<bool> {
        self.simulate_call("opt_out").await?;
        let now = self.clock.now();
        let mut state = self.state();
        state.journey = JourneyState::new(now);
        state.channel_id = None;
        Ok(true)
    }

    async fn get_current_match(&self, session: &Session) -> GatewayResult<Option<MatchPair>> {
        self.simulate_call("get_current_match").await?;
        let state = self.advanced_state();
        if state.journey.current_state != JourneyPhase::Matched {
            return Ok(None);
        }

        Ok(Some(MatchPair {
            user1_id: session.user_id.clone(),
            user2_id: SIMULATED_PARTNER_ID.to_string(),
            score: state.match_score,
            cycle_id: state.cycle_id(),
            channel_id: state.channel_id.clone().unwrap_or_default(),
            created_at: state.journey.matched_at.unwrap_or(state.journey.entered_state_at),
        }))
    }

    async fn get_user_traits(
        &self,
        session: &Session,
    ) -> GatewayResult<Option<UserAggregatedTraits>> {
        self.simulate_call("get_user_traits").await?;
        let state = self.state();
        Ok(Some(state.traits.clone().unwrap_or_else(|| UserAggregatedTraits {
            global_user_id: session.user_id.clone(),
            traits: CANNED_TRAITS.to_string(),
            last_updated: state.journey.entered_state_at,
        })))
    }

    async fn generate_match_embeddings(
        &self,
        session: &Session,
        traits: &[String],
    ) -> GatewayResult<EmbeddingAck> {
        self.simulate_call("generate_match_embeddings").await?;
        if traits.is_empty() {
            return Err(GatewayError::coded(
                400,
                ErrorCode::InsufficientData,
                "no traits submitted",
            ));
        }

        let now = self.clock.now();
        self.state().traits = Some(UserAggregatedTraits {
            global_user_id: session.user_id.clone(),
            traits: traits_descriptor(traits),
            last_updated: now,
        });

        Ok(EmbeddingAck {
            embedding_dimension: self.config.embedding_dimension,
            success: true,
        })
    }

    async fn find_similar_users(
        &self,
        _session: &Session,
        top_k: usize,
        include_vectors: bool,
    ) -> GatewayResult<SimilarUsers> {
        self.simulate_call("find_similar_users").await?;
        let dimension = self.config.embedding_dimension;

        let similar_users: Vec<SimilarUser> = (0..top_k)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let score = (0.95 - 0.05 * i as f64).max(0.0);
                SimilarUser {
                    user_id: format!("sim-user-{:03}", i + 1),
                    score,
                    metadata: json!({ "simulated": true, "rank": i + 1 }),
                    vector: include_vectors.then(|| vec![0.0; dimension]),
                }
            })
            .collect();

        Ok(SimilarUsers {
            count: similar_users.len(),
            similar_users,
        })
    }
}
