//! Batched, retrying trait aggregation across conversation sources.

use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::DomainError;
use crate::domain::models::{AggregationConfig, Session, TraitRecord};
use crate::domain::ports::{GatewayError, RecordPath, RecordStore};
use crate::infrastructure::backend::RetryPolicy;
use crate::services::trait_extraction::{extract_traits, parse_roster, resolve_current_user};

/// Errors that end an aggregation run.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("No traits could be extracted from {attempted} source(s)")]
    NoTraitsExtracted { attempted: usize },

    #[error("An aggregation run is already in progress")]
    Busy,

    #[error("No user identity available")]
    MissingIdentity,
}

/// Why a single source was left out of the result.
#[derive(Debug, Error)]
enum SourceSkip {
    #[error("fetch of {path} failed: {source}")]
    Fetch {
        path: RecordPath,
        #[source]
        source: GatewayError,
    },

    #[error("{0}")]
    Malformed(#[from] DomainError),

    #[error("roster does not resolve exactly one current user")]
    NoCurrentUser,

    #[error("no extraction strategy matched the payload")]
    NoMatchingShape,
}

/// Fetches roster and personality records per source, extracts the current
/// user's traits, and collects one [`TraitRecord`] per usable source.
///
/// Sources are processed in batches of `batch_size`: batches run strictly in
/// order, sources within a batch run concurrently. Only one run is allowed at
/// a time; a second caller gets [`AggregationError::Busy`].
pub struct TraitAggregator {
    store: Arc<dyn RecordStore>,
    retry: RetryPolicy,
    batch_size: usize,
    run_lock: Mutex<()>,
}

impl TraitAggregator {
    pub fn new(store: Arc<dyn RecordStore>, config: &AggregationConfig) -> Self {
        Self {
            store,
            retry: RetryPolicy::from_config(config),
            batch_size: config.batch_size.max(1),
            run_lock: Mutex::new(()),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Aggregate traits from `source_ids`.
    ///
    /// Individual source failures are logged and skipped. Fails only when no
    /// source produced any trait.
    #[instrument(skip_all, fields(user_id = %session.user_id, sources = source_ids.len()))]
    pub async fn aggregate(
        &self,
        session: &Session,
        source_ids: &[String],
    ) -> Result<Vec<TraitRecord>, AggregationError> {
        let _run = self.run_lock.try_lock().map_err(|_| AggregationError::Busy)?;

        if !session.has_identity() {
            return Err(AggregationError::MissingIdentity);
        }

        let mut records = Vec::new();
        for (index, batch) in source_ids.chunks(self.batch_size).enumerate() {
            debug!(batch = index, size = batch.len(), "processing source batch");

            let outcomes = join_all(
                batch
                    .iter()
                    .map(|source_id| self.process_source(session, source_id)),
            )
            .await;

            for (source_id, outcome) in batch.iter().zip(outcomes) {
                match outcome {
                    Ok(record) => {
                        debug!(source_id = %source_id, traits = record.traits.len(), "source extracted");
                        records.push(record);
                    }
                    Err(skip) => warn!(source_id = %source_id, reason = %skip, "skipping source"),
                }
            }
        }

        if records.is_empty() {
            warn!(attempted = source_ids.len(), "aggregation produced no traits");
            return Err(AggregationError::NoTraitsExtracted {
                attempted: source_ids.len(),
            });
        }

        info!(
            attempted = source_ids.len(),
            used = records.len(),
            "aggregation completed"
        );
        Ok(records)
    }

    async fn process_source(
        &self,
        session: &Session,
        source_id: &str,
    ) -> Result<TraitRecord, SourceSkip> {
        let (roster, personality) = tokio::join!(
            self.fetch_json(session, RecordPath::Participants, source_id),
            self.fetch_json(session, RecordPath::Personality, source_id),
        );
        let (roster, personality) = (roster?, personality?);

        let roster = parse_roster(source_id, &roster)?;
        let me = resolve_current_user(&roster, session).ok_or(SourceSkip::NoCurrentUser)?;

        let (strategy, traits) =
            extract_traits(&personality, &me).ok_or(SourceSkip::NoMatchingShape)?;
        debug!(source_id, strategy = strategy.as_str(), "payload shape matched");

        Ok(TraitRecord {
            source_id: source_id.to_string(),
            traits,
        })
    }

    async fn fetch_json(
        &self,
        session: &Session,
        path: RecordPath,
        source_id: &str,
    ) -> Result<Value, SourceSkip> {
        let payload = self
            .retry
            .execute(|| self.store.fetch(session, path, source_id))
            .await
            .map_err(|source| SourceSkip::Fetch { path, source })?;

        payload.into_json().map_err(|err| {
            SourceSkip::Malformed(DomainError::MalformedPayload {
                source_id: source_id.to_string(),
                reason: err.to_string(),
            })
        })
    }
}
