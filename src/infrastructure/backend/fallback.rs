//! Fallback decorator around the live gateway.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

use super::classifier::ErrorClassifier;
use crate::domain::models::{
    EmbeddingAck, MatchPair, MatchingStatus, OptInResponse, Session, SimilarUsers,
    UserAggregatedTraits,
};
use crate::domain::ports::{GatewayResult, MatchGateway};

/// Answers from `fallback` whenever `primary` fails with a retryable error.
///
/// Fatal failures (client errors, missing identity, malformed payloads)
/// propagate unchanged. Embedding submission is never answered by the
/// fallback: a simulated acknowledgement would mark the user eligible
/// without the backend ever holding their traits.
pub struct FallbackGateway {
    primary: Arc<dyn MatchGateway>,
    fallback: Arc<dyn MatchGateway>,
}

impl FallbackGateway {
    pub fn new(primary: Arc<dyn MatchGateway>, fallback: Arc<dyn MatchGateway>) -> Self {
        Self { primary, fallback }
    }

    async fn recover<T, F, Fut>(&self, op: &'static str, result: GatewayResult<T>, fallback: F) -> GatewayResult<T>
    where
        T: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = GatewayResult<T>> + Send,
    {
        match result {
            Ok(value) => Ok(value),
            Err(err) if ErrorClassifier::classify(&err).retryable => {
                warn!(
                    op,
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    error = %err,
                    "primary gateway failed, answering from fallback"
                );
                fallback().await
            }
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl MatchGateway for FallbackGateway {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn can_participate(&self, session: &Session) -> GatewayResult<bool> {
        if !session.has_identity() {
            return Ok(false);
        }
        let result = self.primary.can_participate(session).await;
        self.recover("can_participate", result, || self.fallback.can_participate(session))
            .await
    }

    async fn get_status(&self, session: &Session) -> GatewayResult<Option<MatchingStatus>> {
        let result = self.primary.get_status(session).await;
        self.recover("get_status", result, || self.fallback.get_status(session))
            .await
    }

    async fn opt_in(&self, session: &Session) -> GatewayResult<Option<OptInResponse>> {
        let result = self.primary.opt_in(session).await;
        self.recover("opt_in", result, || self.fallback.opt_in(session)).await
    }

    async fn opt_out(&self, session: &Session) -> GatewayResult<bool> {
        let result = self.primary.opt_out(session).await;
        self.recover("opt_out", result, || self.fallback.opt_out(session)).await
    }

    async fn get_current_match(&self, session: &Session) -> GatewayResult<Option<MatchPair>> {
        let result = self.primary.get_current_match(session).await;
        self.recover("get_current_match", result, || {
            self.fallback.get_current_match(session)
        })
        .await
    }

    async fn get_user_traits(
        &self,
        session: &Session,
    ) -> GatewayResult<Option<UserAggregatedTraits>> {
        let result = self.primary.get_user_traits(session).await;
        self.recover("get_user_traits", result, || {
            self.fallback.get_user_traits(session)
        })
        .await
    }

    async fn generate_match_embeddings(
        &self,
        session: &Session,
        traits: &[String],
    ) -> GatewayResult<EmbeddingAck> {
        self.primary.generate_match_embeddings(session, traits).await
    }

    async fn find_similar_users(
        &self,
        session: &Session,
        top_k: usize,
        include_vectors: bool,
    ) -> GatewayResult<SimilarUsers> {
        let result = self
            .primary
            .find_similar_users(session, top_k, include_vectors)
            .await;
        self.recover("find_similar_users", result, || {
            self.fallback.find_similar_users(session, top_k, include_vectors)
        })
        .await
    }
}
