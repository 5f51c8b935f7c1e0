//! Integration tests for batched trait aggregation.

mod common;

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use kindred::adapters::records::{FailureKind, InMemoryRecordStore};
use kindred::domain::models::{merge_traits, AggregationConfig, Session};
use kindred::domain::ports::{GatewayResult, RecordPath, RecordPayload, RecordStore};
use kindred::services::{AggregationError, TraitAggregator};

fn aggregator(store: &Arc<InMemoryRecordStore>) -> TraitAggregator {
    TraitAggregator::new(store.clone(), &AggregationConfig::default())
}

fn ids(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| (*s).to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_retried_three_times() {
    common::setup_test_logging();
    let store = Arc::new(InMemoryRecordStore::new());
    store.insert_source("flaky", json!(["Sam"]), json!({"X": "steady"}));
    store.fail_always(RecordPath::Personality, "flaky", FailureKind::Network);

    let started = Instant::now();
    let err = aggregator(&store)
        .aggregate(&common::session(), &ids(&["flaky"]))
        .await
        .unwrap_err();

    assert!(matches!(err, AggregationError::NoTraitsExtracted { attempted: 1 }));
    assert_eq!(store.call_count(RecordPath::Personality, "flaky"), 3);
    assert_eq!(store.call_count(RecordPath::Participants, "flaky"), 1);
    assert_eq!(started.elapsed(), Duration::from_millis(3_000));
}

#[tokio::test(start_paused = true)]
async fn test_recovers_after_transient_failures() {
    let store = Arc::new(InMemoryRecordStore::new());
    store.insert_source("c1", json!(["Sam"]), json!({"X": ["patient"]}));
    store.fail_times(RecordPath::Participants, "c1", 2, FailureKind::Unavailable);

    let records = aggregator(&store)
        .aggregate(&common::session(), &ids(&["c1"]))
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert!(records[0].traits.contains("patient"));
    assert_eq!(store.call_count(RecordPath::Participants, "c1"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_every_source_failing_is_an_error() {
    let store = Arc::new(InMemoryRecordStore::new());
    for id in ["a", "b", "c"] {
        store.fail_always(RecordPath::Participants, id, FailureKind::Network);
    }

    let err = aggregator(&store)
        .aggregate(&common::session(), &ids(&["a", "b", "c"]))
        .await
        .unwrap_err();

    match err {
        AggregationError::NoTraitsExtracted { attempted } => assert_eq!(attempted, 3),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_empty_source_list_extracts_nothing() {
    let store = Arc::new(InMemoryRecordStore::new());
    let err = aggregator(&store)
        .aggregate(&common::session(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, AggregationError::NoTraitsExtracted { attempted: 0 }));
    assert_eq!(store.total_calls(), 0);
}

#[tokio::test]
async fn test_merge_across_payload_shapes() {
    let store = Arc::new(InMemoryRecordStore::new());
    store.insert_source(
        "named",
        json!(["Ana", "Sam"]),
        json!({"Sam": {"essence_profile": "kind, funny"}}),
    );
    store.insert_source(
        "positional",
        json!({"participants": [{"name": "Sam"}, {"name": "Bo"}]}),
        json!({"X": ["funny", "curious"], "Z": ["loud"]}),
    );
    store.insert_source(
        "paired",
        json!([{"name": "Kai"}, {"name": "me", "isMe": true}]),
        json!({"user1": "bold", "user2": "kind\nthoughtful"}),
    );

    let records = aggregator(&store)
        .aggregate(&common::session(), &ids(&["named", "positional", "paired"]))
        .await
        .unwrap();
    assert_eq!(records.len(), 3);

    let merged: Vec<String> = merge_traits(&records).into_iter().collect();
    assert_eq!(merged, vec!["kind", "funny", "curious", "thoughtful"]);
}

#[tokio::test]
async fn test_unresolvable_roster_is_skipped() {
    let store = Arc::new(InMemoryRecordStore::new());
    store.insert_source("stranger", json!(["Ana", "Bo"]), json!({"X": "a", "Z": "b"}));
    store.insert_source("mine", json!(["Sam"]), json!({"X": "steady"}));

    let records = aggregator(&store)
        .aggregate(&common::session(), &ids(&["stranger", "mine"]))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source_id, "mine");
}

#[tokio::test]
async fn test_many_sources_are_all_fetched() {
    let store = Arc::new(InMemoryRecordStore::new());
    let sources: Vec<String> = (0..12).map(|i| format!("conv-{i}")).collect();
    for (i, id) in sources.iter().enumerate() {
        store.insert_source(id, json!(["Sam"]), json!({"X": [format!("trait-{}", i % 4)]}));
    }

    let aggregator = aggregator(&store);
    assert_eq!(aggregator.batch_size(), 5);
    let records = aggregator.aggregate(&common::session(), &sources).await.unwrap();

    assert_eq!(records.len(), 12);
    let order: Vec<&str> = records.iter().map(|r| r.source_id.as_str()).collect();
    assert_eq!(order, sources.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(merge_traits(&records).len(), 4);
    assert_eq!(store.total_calls(), 24);
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FetchEvent {
    Started(String),
    Finished(String),
}

/// Wraps the in-memory store with a fixed fetch latency and records when
/// each fetch starts and finishes.
struct SlowTrackingStore {
    inner: InMemoryRecordStore,
    latency: Duration,
    in_flight: Mutex<HashMap<String, usize>>,
    peak_sources: Mutex<usize>,
    events: Mutex<Vec<FetchEvent>>,
}

impl SlowTrackingStore {
    fn new(inner: InMemoryRecordStore, latency: Duration) -> Self {
        Self {
            inner,
            latency,
            in_flight: Mutex::new(HashMap::new()),
            peak_sources: Mutex::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    fn events(&self) -> Vec<FetchEvent> {
        self.events.lock().unwrap().clone()
    }

    fn peak_sources(&self) -> usize {
        *self.peak_sources.lock().unwrap()
    }
}

#[async_trait]
impl RecordStore for SlowTrackingStore {
    async fn fetch(
        &self,
        session: &Session,
        path: RecordPath,
        record_id: &str,
    ) -> GatewayResult<RecordPayload> {
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            *in_flight.entry(record_id.to_string()).or_default() += 1;
            let mut peak = self.peak_sources.lock().unwrap();
            *peak = (*peak).max(in_flight.len());
            self.events
                .lock()
                .unwrap()
                .push(FetchEvent::Started(record_id.to_string()));
        }

        tokio::time::sleep(self.latency).await;
        let result = self.inner.fetch(session, path, record_id).await;

        {
            let mut in_flight = self.in_flight.lock().unwrap();
            if let Some(count) = in_flight.get_mut(record_id) {
                *count -= 1;
                if *count == 0 {
                    in_flight.remove(record_id);
                }
            }
            self.events
                .lock()
                .unwrap()
                .push(FetchEvent::Finished(record_id.to_string()));
        }
        result
    }
}

#[tokio::test(start_paused = true)]
async fn test_batches_bound_concurrency_and_run_in_order() {
    let inner = InMemoryRecordStore::new();
    let sources: Vec<String> = (0..12).map(|i| format!("conv-{i}")).collect();
    for id in &sources {
        inner.insert_source(id, json!(["Sam"]), json!({"X": ["steady"]}));
    }
    let store = Arc::new(SlowTrackingStore::new(inner, Duration::from_millis(100)));
    let aggregator = TraitAggregator::new(store.clone(), &AggregationConfig::default());

    let started = Instant::now();
    let records = aggregator.aggregate(&common::session(), &sources).await.unwrap();

    assert_eq!(records.len(), 12);
    assert_eq!(store.peak_sources(), 5);
    // three batches, each one fetch latency long
    assert_eq!(started.elapsed(), Duration::from_millis(300));

    let events = store.events();
    let first_start = |id: &str| {
        events
            .iter()
            .position(|e| *e == FetchEvent::Started(id.to_string()))
            .unwrap()
    };
    let last_finish = |id: &str| {
        events
            .iter()
            .rposition(|e| *e == FetchEvent::Finished(id.to_string()))
            .unwrap()
    };

    let start_order: Vec<usize> = sources.iter().map(|id| first_start(id)).collect();
    assert!(start_order.windows(2).all(|w| w[0] < w[1]));

    let batches: Vec<&[String]> = sources.chunks(5).collect();
    for pair in batches.windows(2) {
        let previous_done = pair[0].iter().map(|id| last_finish(id)).max().unwrap();
        let next_begins = pair[1].iter().map(|id| first_start(id)).min().unwrap();
        assert!(
            previous_done < next_begins,
            "{} started before {} finished",
            pair[1][0],
            pair[0][pair[0].len() - 1]
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_run_is_rejected() {
    let store = Arc::new(InMemoryRecordStore::new());
    store.insert_source("slow", json!(["Sam"]), json!({"X": "steady"}));
    store.fail_times(RecordPath::Personality, "slow", 1, FailureKind::Network);
    let aggregator = Arc::new(aggregator(&store));

    let session = common::session();
    let sources = ids(&["slow"]);
    let (first, second) = tokio::join!(
        aggregator.aggregate(&session, &sources),
        async {
            tokio::task::yield_now().await;
            aggregator.aggregate(&session, &sources).await
        }
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(AggregationError::Busy)));
}
