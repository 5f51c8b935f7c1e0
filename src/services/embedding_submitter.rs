//! One-shot submission of merged traits for embedding.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::domain::models::{EmbeddingAck, Session};
use crate::domain::ports::{GatewayError, MatchGateway};

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("No traits to submit")]
    EmptyTraits,

    #[error("Backend did not acknowledge the embedding submission")]
    NotAcknowledged,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Sends the merged trait set to the backend in a single call.
///
/// Never retried here and never answered by a fallback: a submission that
/// was not confirmed must not count as one.
pub struct EmbeddingSubmitter {
    gateway: Arc<dyn MatchGateway>,
}

impl EmbeddingSubmitter {
    pub fn new(gateway: Arc<dyn MatchGateway>) -> Self {
        Self { gateway }
    }

    #[instrument(skip_all, fields(user_id = %session.user_id, traits = traits.len()))]
    pub async fn submit(
        &self,
        session: &Session,
        traits: &[String],
    ) -> Result<EmbeddingAck, SubmissionError> {
        if traits.is_empty() {
            return Err(SubmissionError::EmptyTraits);
        }

        let ack = self
            .gateway
            .generate_match_embeddings(session, traits)
            .await
            .inspect_err(|err| warn!(error = %err, "embedding submission failed"))?;

        if !ack.success {
            warn!("embedding submission not acknowledged");
            return Err(SubmissionError::NotAcknowledged);
        }

        info!(dimension = ack.embedding_dimension, "embeddings generated");
        Ok(ack)
    }
}
