//! The synchronizer's published view of the matching lifecycle.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::matching::{MatchPair, MatchingStatus, UiMatchingStatus, UserAggregatedTraits};

/// Everything derived in one synchronization pass.
///
/// Published whole so observers never see a new `current_match` next to a
/// stale `status`. `current_match` is `Some` exactly when `ui_status` is
/// `Matched`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncSnapshot {
    pub ui_status: UiMatchingStatus,
    pub status: Option<MatchingStatus>,
    pub current_match: Option<MatchPair>,
    pub user_traits: Option<UserAggregatedTraits>,
    pub wait_time_minutes: u64,
    /// Time of the last successful pass
    pub last_refresh: Option<DateTime<Utc>>,
    /// Sanitized message from the most recent failed pass or action
    pub last_error: Option<String>,
}

impl SyncSnapshot {
    /// Initial snapshot before any pass has succeeded.
    pub fn loading() -> Self {
        Self {
            ui_status: UiMatchingStatus::Loading,
            status: None,
            current_match: None,
            user_traits: None,
            wait_time_minutes: 0,
            last_refresh: None,
            last_error: None,
        }
    }

    /// Score of the active match, if matched.
    pub fn match_score(&self) -> Option<f64> {
        self.current_match.as_ref().map(|pair| pair.score)
    }
}

impl Default for SyncSnapshot {
    fn default() -> Self {
        Self::loading()
    }
}
