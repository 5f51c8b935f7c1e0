//! Matching-lifecycle synchronization.
//!
//! [`StatusSynchronizer`] owns the UI-facing state machine for one user
//! session:
//!
//! ```text
//! loading -> {not-eligible | eligible} -> processing -> waiting -> matched
//!         -> eligible (after opt-out) | not-eligible
//! ```
//!
//! Every pass reads eligibility, then status, current match and traits
//! concurrently, and publishes the derived [`SyncSnapshot`] in one step.
//! Refreshes, opt-ins and opt-outs are serialized behind a single lock, so
//! observers never see a torn snapshot.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, instrument, warn};

use crate::domain::models::{
    Config, MatchPair, MatchingStatus, Session, SyncSnapshot, UiMatchingStatus,
    UserAggregatedTraits,
};
use crate::domain::ports::{Clock, GatewayError, GatewayResult, IdentityProvider, MatchGateway};
use crate::infrastructure::backend::ErrorClassifier;

/// Timing knobs for the synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Target interval between refreshes while `waiting`
    pub refresh_interval_waiting: Duration,
    /// Target interval in every other state
    pub refresh_interval_default: Duration,
    /// How long after opting in a seeking user still counts as `processing`
    pub processing_window: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refresh_interval_waiting: Duration::from_secs(30),
            refresh_interval_default: Duration::from_secs(120),
            processing_window: Duration::from_secs(60),
        }
    }
}

impl SyncConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            refresh_interval_waiting: Duration::from_millis(config.refresh_interval_waiting_ms),
            refresh_interval_default: Duration::from_millis(config.refresh_interval_default_ms),
            processing_window: Duration::from_secs(config.processing_window_secs),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Synchronizer has been shut down")]
    Closed,

    #[error("Refresh failed: {0}")]
    Gateway(#[from] GatewayError),
}

impl SyncError {
    /// Message safe to show an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Closed => ErrorClassifier::user_message(None),
            Self::Gateway(err) => ErrorClassifier::classify(err).user_message,
        }
    }
}

/// Result of one successful pass, before publication.
struct Pass {
    ui_status: UiMatchingStatus,
    status: Option<MatchingStatus>,
    current_match: Option<MatchPair>,
    user_traits: Option<UserAggregatedTraits>,
    wait_time_minutes: u64,
}

impl Pass {
    fn not_eligible() -> Self {
        Self {
            ui_status: UiMatchingStatus::NotEligible,
            status: None,
            current_match: None,
            user_traits: None,
            wait_time_minutes: 0,
        }
    }
}

/// Derive the UI status of an eligible user.
///
/// A present match always wins. A seeking user is `processing` while the
/// opt-in is younger than `processing_window`, `waiting` after that or when
/// the backend sent no timestamp.
pub fn derive_ui_status(
    status: Option<&MatchingStatus>,
    current_match: Option<&MatchPair>,
    now: DateTime<Utc>,
    processing_window: Duration,
) -> UiMatchingStatus {
    if current_match.is_some() {
        return UiMatchingStatus::Matched;
    }

    match status {
        Some(status) if status.is_seeking_match => match status.opt_in_timestamp {
            Some(opted_in) if elapsed_since(opted_in, now) < processing_window => {
                UiMatchingStatus::Processing
            }
            _ => UiMatchingStatus::Waiting,
        },
        _ => UiMatchingStatus::Eligible,
    }
}

/// Whole minutes since `opted_in`, never negative.
pub fn wait_time_minutes(opted_in: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u64 {
    opted_in.map_or(0, |at| elapsed_since(at, now).as_secs() / 60)
}

fn elapsed_since(at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(at).to_std().unwrap_or(Duration::ZERO)
}

/// Owns the matching state of one user session.
pub struct StatusSynchronizer {
    gateway: Arc<dyn MatchGateway>,
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    config: SyncConfig,
    op_lock: Mutex<()>,
    state: watch::Sender<SyncSnapshot>,
    closed: AtomicBool,
}

impl StatusSynchronizer {
    pub fn new(
        gateway: Arc<dyn MatchGateway>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
        config: SyncConfig,
    ) -> Self {
        let (state, _) = watch::channel(SyncSnapshot::loading());
        Self {
            gateway,
            identity,
            clock,
            config,
            op_lock: Mutex::new(()),
            state,
            closed: AtomicBool::new(false),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn current_state(&self) -> UiMatchingStatus {
        self.state.borrow().ui_status
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        self.state.borrow().clone()
    }

    /// Receive every published snapshot. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<SyncSnapshot> {
        self.state.subscribe()
    }

    /// Stop publishing. Passes still in flight are discarded.
    pub fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("status synchronizer shut down");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Refresh cadence for `state`: short while waiting, long otherwise.
    pub fn target_interval(&self, state: UiMatchingStatus) -> Duration {
        match state {
            UiMatchingStatus::Waiting => self.config.refresh_interval_waiting,
            _ => self.config.refresh_interval_default,
        }
    }

    /// Whether enough time has passed since the last successful pass for
    /// the current state's interval.
    pub fn is_refresh_due(&self, now: DateTime<Utc>) -> bool {
        let (state, last_refresh) = {
            let snapshot = self.state.borrow();
            (snapshot.ui_status, snapshot.last_refresh)
        };
        last_refresh.map_or(true, |at| elapsed_since(at, now) >= self.target_interval(state))
    }

    /// Run one synchronization pass.
    ///
    /// On failure the previous snapshot stays in place apart from
    /// `last_error`.
    pub async fn refresh(&self) -> Result<UiMatchingStatus, SyncError> {
        let _op = self.op_lock.lock().await;
        self.refresh_locked().await
    }

    /// Opt into matching. Only allowed from `eligible`; any other state is
    /// rejected without a backend call.
    #[instrument(skip(self))]
    pub async fn opt_in(&self) -> bool {
        let _op = self.op_lock.lock().await;
        if self.is_closed() {
            return false;
        }

        let state = self.current_state();
        if state != UiMatchingStatus::Eligible {
            debug!(state = %state, "opt-in rejected");
            return false;
        }
        let Some(session) = self.identity.current_session() else {
            return false;
        };

        match self.gateway.opt_in(&session).await {
            Ok(Some(response)) if response.success => {
                let now = self.clock.now();
                let status = response
                    .data
                    .matching_status
                    .unwrap_or_else(|| MatchingStatus::seeking(now));
                self.publish(|snapshot| {
                    snapshot.wait_time_minutes = wait_time_minutes(status.opt_in_timestamp, now);
                    snapshot.ui_status = UiMatchingStatus::Processing;
                    snapshot.status = Some(status);
                    snapshot.current_match = None;
                    snapshot.last_error = None;
                });
                info!("opted in to matching");

                if let Err(err) = self.refresh_locked().await {
                    debug!(error = %err, "refresh after opt-in failed");
                }
                true
            }
            Ok(response) => {
                let message = response.and_then(|r| r.message);
                info!(message = message.as_deref().unwrap_or_default(), "opt-in declined");
                false
            }
            Err(err) => {
                self.record_failure("opt-in", &err);
                false
            }
        }
    }

    /// Opt out of matching and resynchronize.
    #[instrument(skip(self))]
    pub async fn opt_out(&self) -> bool {
        let _op = self.op_lock.lock().await;
        if self.is_closed() {
            return false;
        }
        let Some(session) = self.identity.current_session() else {
            return false;
        };

        match self.gateway.opt_out(&session).await {
            Ok(true) => {
                info!("opted out of matching");
                if let Err(err) = self.refresh_locked().await {
                    debug!(error = %err, "refresh after opt-out failed");
                }
                true
            }
            Ok(false) => {
                info!("opt-out declined");
                false
            }
            Err(err) => {
                self.record_failure("opt-out", &err);
                false
            }
        }
    }

    async fn refresh_locked(&self) -> Result<UiMatchingStatus, SyncError> {
        if self.is_closed() {
            return Err(SyncError::Closed);
        }

        let pass = match self.identity.current_session() {
            Some(session) => self.run_pass(&session).await,
            None => {
                debug!("no identity, not eligible");
                Ok(Pass::not_eligible())
            }
        };

        let pass = match pass {
            Ok(pass) => pass,
            Err(err) => {
                self.record_failure("refresh", &err);
                return Err(SyncError::Gateway(err));
            }
        };

        if self.is_closed() {
            return Err(SyncError::Closed);
        }

        let now = self.clock.now();
        let ui_status = pass.ui_status;
        let previous = self.publish(|snapshot| {
            *snapshot = SyncSnapshot {
                ui_status: pass.ui_status,
                status: pass.status,
                current_match: pass.current_match,
                user_traits: pass.user_traits,
                wait_time_minutes: pass.wait_time_minutes,
                last_refresh: Some(now),
                last_error: None,
            };
        });

        if previous != ui_status {
            info!(from = %previous, to = %ui_status, "matching state changed");
        }
        Ok(ui_status)
    }

    async fn run_pass(&self, session: &Session) -> GatewayResult<Pass> {
        if !self.gateway.can_participate(session).await? {
            return Ok(Pass::not_eligible());
        }

        let (status, current_match, user_traits) = tokio::try_join!(
            self.gateway.get_status(session),
            self.gateway.get_current_match(session),
            self.gateway.get_user_traits(session),
        )?;

        let now = self.clock.now();
        let ui_status = derive_ui_status(
            status.as_ref(),
            current_match.as_ref(),
            now,
            self.config.processing_window,
        );
        let wait_time_minutes =
            wait_time_minutes(status.as_ref().and_then(|s| s.opt_in_timestamp), now);

        Ok(Pass {
            ui_status,
            status,
            current_match,
            user_traits,
            wait_time_minutes,
        })
    }

    fn record_failure(&self, op: &'static str, err: &GatewayError) {
        let classification = ErrorClassifier::classify(err);
        warn!(
            op,
            error = %err,
            retryable = classification.retryable,
            "matching operation failed"
        );
        self.publish(|snapshot| {
            snapshot.last_error = Some(classification.user_message.to_string());
        });
    }

    /// Apply `update` and publish the result. Returns the previous UI state.
    /// Does nothing once shut down.
    fn publish(&self, update: impl FnOnce(&mut SyncSnapshot)) -> UiMatchingStatus {
        let mut previous = self.current_state();
        if self.is_closed() {
            return previous;
        }
        self.state.send_modify(|snapshot| {
            previous = snapshot.ui_status;
            update(snapshot);
        });
        previous
    }
}
