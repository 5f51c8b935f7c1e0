//! Matching backend port.
//!
//! One trait, several implementations selected once at construction time:
//! the live RPC client, the journey simulator, and a fallback decorator
//! combining the two.

use async_trait::async_trait;

use super::errors::GatewayResult;
use crate::domain::models::{
    EmbeddingAck, MatchPair, MatchingStatus, OptInResponse, Session, SimilarUsers,
    UserAggregatedTraits,
};

/// Client-side view of the matching backend.
///
/// Implementations are stateless between calls; all matching state is
/// owned by the backend (or by the simulator's journey state).
#[async_trait]
pub trait MatchGateway: Send + Sync {
    /// Implementation name (e.g., "live", "simulated", "fallback").
    fn name(&self) -> &'static str;

    /// Whether the user has enough aggregated trait data to enter the pool.
    async fn can_participate(&self, session: &Session) -> GatewayResult<bool>;

    /// Current matching status, if the backend has one for this user.
    async fn get_status(&self, session: &Session) -> GatewayResult<Option<MatchingStatus>>;

    /// Enter the matching queue.
    async fn opt_in(&self, session: &Session) -> GatewayResult<Option<OptInResponse>>;

    /// Leave the matching queue (and any active match).
    async fn opt_out(&self, session: &Session) -> GatewayResult<bool>;

    /// Active match, absent once either side opts out or a new cycle starts.
    async fn get_current_match(&self, session: &Session) -> GatewayResult<Option<MatchPair>>;

    /// The merged trait descriptor stored for this user.
    async fn get_user_traits(
        &self,
        session: &Session,
    ) -> GatewayResult<Option<UserAggregatedTraits>>;

    /// Submit merged traits for embedding. Not idempotent; callers decide
    /// whether to retry.
    async fn generate_match_embeddings(
        &self,
        session: &Session,
        traits: &[String],
    ) -> GatewayResult<EmbeddingAck>;

    /// Nearest users by trait-embedding similarity.
    async fn find_similar_users(
        &self,
        session: &Session,
        top_k: usize,
        include_vectors: bool,
    ) -> GatewayResult<SimilarUsers>;
}
