use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::models::Session;
use crate::domain::ports::{GatewayError, GatewayResult, RecordPath, RecordPayload, RecordStore};

type RecordKey = (RecordPath, String);

/// How an injected failure behaves.
#[derive(Debug, Clone)]
enum FailureMode {
    /// Fail every call
    Always(FailureKind),
    /// Fail the next `n` calls, then serve the record
    Times(u32, FailureKind),
}

/// Failure shape to inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport failure, retried by the aggregator
    Network,
    /// Server-side failure, retried by the aggregator
    Unavailable,
    /// Client error, never retried
    NotFound,
}

impl FailureKind {
    fn to_error(self, path: RecordPath, record_id: &str) -> GatewayError {
        match self {
            Self::Network => GatewayError::Network(format!("connection refused: {path}/{record_id}")),
            Self::Unavailable => GatewayError::from_status(503, "record store unavailable"),
            Self::NotFound => GatewayError::from_status(404, "record not found"),
        }
    }
}

#[derive(Default)]
struct Inner {
    records: HashMap<RecordKey, RecordPayload>,
    failures: HashMap<RecordKey, FailureMode>,
    calls: HashMap<RecordKey, u32>,
}

/// In-process record store with failure injection and call counting.
#[derive(Default)]
pub struct InMemoryRecordStore {
    inner: Mutex<Inner>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A store holding two sample conversations, used in mock mode.
    ///
    /// Rosters flag the current user explicitly so any session resolves.
    pub fn with_demo_sources() -> Self {
        let store = Self::new();
        store.insert_source(
            "demo-1",
            json!({"participants": [{"name": "you", "isMe": true}, {"name": "Robin"}]}),
            json!({"X": ["curious", "warm"], "Z": ["direct"]}),
        );
        store.insert_source(
            "demo-2",
            json!([{"name": "Kai"}, {"name": "you", "isMe": true}]),
            json!({"user1": "calm", "user2": "warm; playful"}),
        );
        store
    }

    /// Ids of every stored source, sorted.
    pub fn source_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .lock()
            .records
            .keys()
            .filter(|(path, _)| *path == RecordPath::Participants)
            .map(|(_, id)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn insert(&self, path: RecordPath, record_id: impl Into<String>, payload: RecordPayload) {
        self.lock().records.insert((path, record_id.into()), payload);
    }

    pub fn insert_json(&self, path: RecordPath, record_id: impl Into<String>, value: Value) {
        self.insert(path, record_id, RecordPayload::Json(value));
    }

    /// Store both halves of one conversation source.
    pub fn insert_source(&self, source_id: &str, participants: Value, personality: Value) {
        self.insert_json(RecordPath::Participants, source_id, participants);
        self.insert_json(RecordPath::Personality, source_id, personality);
    }

    /// Every fetch of `(path, record_id)` fails with `kind`.
    pub fn fail_always(&self, path: RecordPath, record_id: impl Into<String>, kind: FailureKind) {
        self.lock()
            .failures
            .insert((path, record_id.into()), FailureMode::Always(kind));
    }

    /// The next `times` fetches of `(path, record_id)` fail with `kind`.
    pub fn fail_times(
        &self,
        path: RecordPath,
        record_id: impl Into<String>,
        times: u32,
        kind: FailureKind,
    ) {
        self.lock()
            .failures
            .insert((path, record_id.into()), FailureMode::Times(times, kind));
    }

    /// Fetches issued for `(path, record_id)` so far, failed ones included.
    pub fn call_count(&self, path: RecordPath, record_id: &str) -> u32 {
        self.lock()
            .calls
            .get(&(path, record_id.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.lock().calls.values().sum()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn fetch(
        &self,
        _session: &Session,
        path: RecordPath,
        record_id: &str,
    ) -> GatewayResult<RecordPayload> {
        let key = (path, record_id.to_string());
        let mut inner = self.lock();
        *inner.calls.entry(key.clone()).or_insert(0) += 1;

        let injected = match inner.failures.get_mut(&key) {
            Some(FailureMode::Always(kind)) => Some(*kind),
            Some(FailureMode::Times(remaining, kind)) if *remaining > 0 => {
                *remaining -= 1;
                Some(*kind)
            }
            _ => None,
        };
        if let Some(kind) = injected {
            return Err(kind.to_error(path, record_id));
        }

        inner
            .records
            .get(&key)
            .cloned()
            .ok_or_else(|| GatewayError::from_status(404, "record not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_inserted_records() {
        let store = InMemoryRecordStore::new();
        store.insert_json(RecordPath::Personality, "c1", json!({"X": ["kind"]}));

        let session = Session::new("me");
        let payload = store.fetch(&session, RecordPath::Personality, "c1").await.unwrap();
        assert_eq!(payload, RecordPayload::Json(json!({"X": ["kind"]})));

        let missing = store.fetch(&session, RecordPath::Participants, "c1").await.unwrap_err();
        assert_eq!(missing.status_code(), Some(404));
        assert_eq!(store.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_fail_times_then_recovers() {
        let store = InMemoryRecordStore::new();
        store.insert_json(RecordPath::Participants, "c1", json!(["me"]));
        store.fail_times(RecordPath::Participants, "c1", 2, FailureKind::Network);

        let session = Session::new("me");
        assert!(store.fetch(&session, RecordPath::Participants, "c1").await.is_err());
        assert!(store.fetch(&session, RecordPath::Participants, "c1").await.is_err());
        assert!(store.fetch(&session, RecordPath::Participants, "c1").await.is_ok());
        assert_eq!(store.call_count(RecordPath::Participants, "c1"), 3);
    }
}
