//! Background polling cadence against paused tokio time.

mod common;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use common::{synchronizer, ScriptedGateway};
use kindred::adapters::simulator::SimulatedGateway;
use kindred::domain::models::{MatchingStatus, SimulatorConfig, UiMatchingStatus};
use kindred::domain::ports::{Clock, ManualClock};
use kindred::services::PollScheduler;

/// Move the wall clock and tokio time forward together, one second at a time.
async fn step(clock: &ManualClock, secs: u64) {
    for _ in 0..secs {
        clock.advance(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_eligible_refreshes_on_long_interval() {
    let clock = Arc::new(ManualClock::default());
    let gateway = Arc::new(ScriptedGateway::new(clock.clone()));
    let sync = Arc::new(synchronizer(gateway.clone(), clock.clone()));

    let handle = PollScheduler::spawn(sync.clone(), Duration::from_secs(1));
    step(&clock, 60).await;

    assert_eq!(sync.current_state(), UiMatchingStatus::Eligible);
    assert_eq!(gateway.calls("get_status"), 1);

    step(&clock, 70).await;
    assert_eq!(gateway.calls("get_status"), 2);

    let status = handle.status().await;
    assert!(status.ticks >= 120);
    assert_eq!(status.refreshes, 2);
    assert_eq!(status.failed_refreshes, 0);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_waiting_refreshes_on_short_interval() {
    let clock = Arc::new(ManualClock::default());
    let gateway = Arc::new(ScriptedGateway::new(clock.clone()));
    let opted_in = clock.now() - chrono::Duration::minutes(10);
    gateway.update(|s| s.status = Some(MatchingStatus::seeking(opted_in)));
    let sync = Arc::new(synchronizer(gateway.clone(), clock.clone()));

    let handle = PollScheduler::spawn(sync.clone(), Duration::from_secs(1));
    step(&clock, 65).await;

    assert_eq!(sync.current_state(), UiMatchingStatus::Waiting);
    assert_eq!(gateway.calls("get_status"), 3);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_interval_follows_state_changes() {
    let clock = Arc::new(ManualClock::default());
    let gateway = Arc::new(ScriptedGateway::new(clock.clone()));
    let sync = Arc::new(synchronizer(gateway.clone(), clock.clone()));

    let handle = PollScheduler::spawn(sync.clone(), Duration::from_secs(1));
    step(&clock, 5).await;
    assert_eq!(sync.current_state(), UiMatchingStatus::Eligible);

    assert!(sync.opt_in().await);
    assert_eq!(sync.current_state(), UiMatchingStatus::Processing);

    // processing polls on the long interval
    step(&clock, 100).await;
    assert_eq!(sync.current_state(), UiMatchingStatus::Processing);
    step(&clock, 30).await;
    assert_eq!(sync.current_state(), UiMatchingStatus::Waiting);

    let before = gateway.calls("get_status");
    step(&clock, 61).await;
    assert!(gateway.calls("get_status") >= before + 2);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_refreshes_are_counted() {
    let clock = Arc::new(ManualClock::default());
    let gateway = Arc::new(ScriptedGateway::new(clock.clone()));
    gateway.update(|s| s.fault = Some(common::Fault::Network));
    let sync = Arc::new(synchronizer(gateway.clone(), clock.clone()));

    let handle = PollScheduler::spawn(sync.clone(), Duration::from_secs(1));
    step(&clock, 3).await;

    let status = handle.status().await;
    assert!(status.failed_refreshes >= 1);
    assert_eq!(status.refreshes, status.failed_refreshes);
    assert_eq!(sync.current_state(), UiMatchingStatus::Loading);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_abandons_slow_refresh() {
    let clock = Arc::new(ManualClock::default());
    let config = SimulatorConfig {
        min_latency_ms: 30_000,
        max_latency_ms: 30_000,
        ..Default::default()
    };
    let gateway = Arc::new(SimulatedGateway::new(config, clock.clone()));
    let sync = Arc::new(synchronizer(gateway, clock));

    let handle = PollScheduler::spawn(sync.clone(), Duration::from_secs(1));
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(handle.status().await.running);

    let started = Instant::now();
    handle.shutdown().await;

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(sync.is_closed());
    assert_eq!(sync.current_state(), UiMatchingStatus::Loading);
}
