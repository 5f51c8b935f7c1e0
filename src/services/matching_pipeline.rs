//! Aggregate -> merge -> submit.

use indexmap::IndexSet;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

use crate::domain::models::{merge_traits, Session, TraitRecord};
use crate::domain::ports::ErrorCode;
use crate::infrastructure::backend::ErrorClassifier;
use crate::services::embedding_submitter::{EmbeddingSubmitter, SubmissionError};
use crate::services::trait_aggregator::{AggregationError, TraitAggregator};

/// Step of the pipeline a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    FetchingTraits,
    ProcessingEmbeddings,
}

impl PipelineStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchingTraits => "Fetching user traits",
            Self::ProcessingEmbeddings => "Processing embeddings",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed pipeline run: which step, and what to tell the user.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{step} failed: {user_message}")]
pub struct StepFailure {
    pub step: PipelineStep,
    pub user_message: String,
    pub retryable: bool,
}

impl From<AggregationError> for StepFailure {
    fn from(err: AggregationError) -> Self {
        let (retryable, code) = match err {
            AggregationError::NoTraitsExtracted { .. } => (false, Some(ErrorCode::InsufficientData)),
            AggregationError::MissingIdentity => (false, Some(ErrorCode::AuthenticationFailed)),
            AggregationError::Busy => (true, None),
        };
        Self {
            step: PipelineStep::FetchingTraits,
            user_message: ErrorClassifier::user_message(code).to_string(),
            retryable,
        }
    }
}

impl From<SubmissionError> for StepFailure {
    fn from(err: SubmissionError) -> Self {
        let (retryable, message) = match &err {
            SubmissionError::EmptyTraits => (
                false,
                ErrorClassifier::user_message(Some(ErrorCode::InsufficientData)),
            ),
            SubmissionError::NotAcknowledged => (true, ErrorClassifier::user_message(None)),
            SubmissionError::Gateway(gateway_err) => {
                let classification = ErrorClassifier::classify(gateway_err);
                (classification.retryable, classification.user_message)
            }
        };
        Self {
            step: PipelineStep::ProcessingEmbeddings,
            user_message: message.to_string(),
            retryable,
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub records: Vec<TraitRecord>,
    pub merged_traits: IndexSet<String>,
    pub embedding_dimension: usize,
    pub sources_attempted: usize,
    pub sources_used: usize,
}

pub struct MatchingPipeline {
    aggregator: Arc<TraitAggregator>,
    submitter: Arc<EmbeddingSubmitter>,
}

impl MatchingPipeline {
    pub fn new(aggregator: Arc<TraitAggregator>, submitter: Arc<EmbeddingSubmitter>) -> Self {
        Self {
            aggregator,
            submitter,
        }
    }

    /// Build the merged trait set from `source_ids` and submit it.
    #[instrument(skip_all, fields(user_id = %session.user_id, sources = source_ids.len()))]
    pub async fn run(
        &self,
        session: &Session,
        source_ids: &[String],
    ) -> Result<PipelineReport, StepFailure> {
        let records = self.aggregator.aggregate(session, source_ids).await?;
        let merged_traits = merge_traits(&records);

        let traits: Vec<String> = merged_traits.iter().cloned().collect();
        let ack = self.submitter.submit(session, &traits).await?;

        info!(
            sources_used = records.len(),
            traits = merged_traits.len(),
            dimension = ack.embedding_dimension,
            "matching pipeline completed"
        );

        Ok(PipelineReport {
            sources_attempted: source_ids.len(),
            sources_used: records.len(),
            records,
            merged_traits,
            embedding_dimension: ack.embedding_dimension,
        })
    }
}
