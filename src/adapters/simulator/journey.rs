//! Time-driven journey state for the simulated backend.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where a simulated user is in the matching lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JourneyPhase {
    New,
    Waiting,
    Matched,
}

/// Timestamps driving the simulator's auto-transitions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneyState {
    pub current_state: JourneyPhase,
    pub entered_state_at: DateTime<Utc>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub waiting_started_at: Option<DateTime<Utc>>,
    pub matched_at: Option<DateTime<Utc>>,
}

impl JourneyState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            current_state: JourneyPhase::New,
            entered_state_at: now,
            processing_started_at: None,
            waiting_started_at: None,
            matched_at: None,
        }
    }

    /// Enter the queue at `at`.
    pub fn begin_waiting(&mut self, at: DateTime<Utc>) {
        self.current_state = JourneyPhase::Waiting;
        self.entered_state_at = at;
        self.processing_started_at = Some(at);
        self.waiting_started_at = Some(at);
        self.matched_at = None;
    }

    /// Become matched at `at`.
    pub fn begin_matched(&mut self, at: DateTime<Utc>) {
        self.current_state = JourneyPhase::Matched;
        self.entered_state_at = at;
        self.matched_at = Some(at);
    }

    /// Auto-transition `waiting -> matched` once `waiting_for` has elapsed.
    /// Returns true when the journey moved.
    pub fn advance(&mut self, now: DateTime<Utc>, waiting_for: Duration) -> bool {
        if self.current_state != JourneyPhase::Waiting {
            return false;
        }
        let Some(started) = self.waiting_started_at else {
            return false;
        };
        let waited = now.signed_duration_since(started);
        let due = ChronoDuration::from_std(waiting_for).unwrap_or(ChronoDuration::zero());
        if waited >= due {
            self.begin_matched(now);
            true
        } else {
            false
        }
    }

    /// Time spent in the current phase.
    pub fn time_in_state(&self, now: DateTime<Utc>) -> ChronoDuration {
        now.signed_duration_since(self.entered_state_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waiting_flips_after_duration() {
        let start = Utc::now();
        let mut journey = JourneyState::new(start);
        journey.begin_waiting(start);

        assert!(!journey.advance(start + ChronoDuration::seconds(59), Duration::from_secs(60)));
        assert_eq!(journey.current_state, JourneyPhase::Waiting);

        assert!(journey.advance(start + ChronoDuration::seconds(60), Duration::from_secs(60)));
        assert_eq!(journey.current_state, JourneyPhase::Matched);
        assert!(journey.matched_at.is_some());
    }

    #[test]
    fn test_new_journey_never_advances() {
        let start = Utc::now();
        let mut journey = JourneyState::new(start);
        assert!(!journey.advance(start + ChronoDuration::days(1), Duration::ZERO));
        assert_eq!(journey.current_state, JourneyPhase::New);
    }
}
