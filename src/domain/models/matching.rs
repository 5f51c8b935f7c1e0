//! Client-observable matching records.
//!
//! These mirror the backend's wire objects. The client only ever holds
//! read-only snapshots of them; the server owns every transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-owned matching status for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingStatus {
    /// Whether the user is currently queued for a matching cycle
    #[serde(default)]
    pub is_seeking_match: bool,

    /// When the user last opted in
    #[serde(default)]
    pub opt_in_timestamp: Option<DateTime<Utc>>,

    /// True until the user opts in for the first time
    #[serde(default)]
    pub has_never_opted_in: Option<bool>,

    /// Cycle that produced the user's most recent match
    #[serde(default)]
    pub last_matched_cycle_id: Option<String>,

    /// Partner of the active match, if any
    #[serde(default)]
    pub current_match_partner_id: Option<String>,

    /// Cycles the user sat through without being paired
    #[serde(default)]
    pub missed_cycles_count: u32,
}

impl MatchingStatus {
    /// Status of a user who has never entered the queue.
    pub fn idle() -> Self {
        Self {
            is_seeking_match: false,
            opt_in_timestamp: None,
            has_never_opted_in: Some(true),
            last_matched_cycle_id: None,
            current_match_partner_id: None,
            missed_cycles_count: 0,
        }
    }

    /// Status of a user queued since `opted_in_at`.
    pub fn seeking(opted_in_at: DateTime<Utc>) -> Self {
        Self {
            is_seeking_match: true,
            opt_in_timestamp: Some(opted_in_at),
            has_never_opted_in: Some(false),
            ..Self::idle()
        }
    }
}

/// An active pairing produced by a matching cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPair {
    pub user1_id: String,
    pub user2_id: String,
    /// Similarity score in `[0, 1]`
    pub score: f64,
    pub cycle_id: String,
    pub channel_id: String,
    pub created_at: DateTime<Utc>,
}

impl MatchPair {
    /// The member of the pair that is not `user_id`.
    pub fn partner_of(&self, user_id: &str) -> &str {
        if self.user1_id == user_id {
            &self.user2_id
        } else {
            &self.user1_id
        }
    }
}

/// Merged trait descriptor the backend matches on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAggregatedTraits {
    pub global_user_id: String,
    /// Human-readable merged descriptor
    pub traits: String,
    pub last_updated: DateTime<Utc>,
}

impl UserAggregatedTraits {
    /// Whether the descriptor carries any usable trait text.
    pub fn has_traits(&self) -> bool {
        !self.traits.trim().is_empty()
    }
}

/// Payload of the `opt_in_match` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptInData {
    #[serde(default)]
    pub matching_status: Option<MatchingStatus>,
}

/// Response envelope returned by `opt_in_match`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptInResponse {
    pub success: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: OptInData,
}

/// Acknowledgement of an embedding submission. The raw vector never
/// leaves the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingAck {
    pub embedding_dimension: usize,
    #[serde(default = "default_acknowledged")]
    pub success: bool,
}

fn default_acknowledged() -> bool {
    true
}

/// One entry of a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarUser {
    pub user_id: String,
    pub score: f64,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

/// Result of `find_similar_users`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarUsers {
    #[serde(default)]
    pub similar_users: Vec<SimilarUser>,
    #[serde(default)]
    pub count: usize,
}

/// UI-facing matching state. Derived on every refresh, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UiMatchingStatus {
    Loading,
    NotEligible,
    Eligible,
    Processing,
    Waiting,
    Matched,
}

impl UiMatchingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::NotEligible => "not-eligible",
            Self::Eligible => "eligible",
            Self::Processing => "processing",
            Self::Waiting => "waiting",
            Self::Matched => "matched",
        }
    }

    /// Whether the user is in the queue (optimistically or confirmed).
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Processing | Self::Waiting)
    }
}

impl fmt::Display for UiMatchingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_deserializes_sparse_payload() {
        let status: MatchingStatus =
            serde_json::from_str(r#"{"isSeekingMatch": true, "optInTimestamp": "2025-03-01T10:00:00Z"}"#)
                .unwrap();

        assert!(status.is_seeking_match);
        assert_eq!(
            status.opt_in_timestamp,
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(status.missed_cycles_count, 0);
        assert!(status.current_match_partner_id.is_none());
    }

    #[test]
    fn test_partner_of() {
        let pair = MatchPair {
            user1_id: "alice".to_string(),
            user2_id: "bob".to_string(),
            score: 0.8,
            cycle_id: "c1".to_string(),
            channel_id: "ch".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(pair.partner_of("alice"), "bob");
        assert_eq!(pair.partner_of("bob"), "alice");
    }

    #[test]
    fn test_ui_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&UiMatchingStatus::NotEligible).unwrap(),
            "\"not-eligible\""
        );
        assert_eq!(UiMatchingStatus::Waiting.to_string(), "waiting");
        assert!(UiMatchingStatus::Processing.is_queued());
        assert!(!UiMatchingStatus::Matched.is_queued());
    }

    #[test]
    fn test_embedding_ack_defaults_to_acknowledged() {
        let ack: EmbeddingAck = serde_json::from_str(r#"{"embeddingDimension": 384}"#).unwrap();
        assert_eq!(ack.embedding_dimension, 384);
        assert!(ack.success);
    }

    #[test]
    fn test_empty_traits_descriptor() {
        let traits = UserAggregatedTraits {
            global_user_id: "u".to_string(),
            traits: "   ".to_string(),
            last_updated: Utc::now(),
        };
        assert!(!traits.has_traits());
    }
}
