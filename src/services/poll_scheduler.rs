//! Background polling for the status synchronizer.
//!
//! The loop wakes on a short fixed tick and asks the synchronizer whether a
//! refresh is due for its *current* state. Nothing about the state is
//! captured when the loop starts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::services::status_synchronizer::StatusSynchronizer;

/// Counters reported by a running poll loop.
#[derive(Debug, Clone, Default)]
pub struct PollStatus {
    /// Whether the loop is running.
    pub running: bool,
    /// Ticks observed, including ones that did not refresh.
    pub ticks: u64,
    /// Refreshes attempted.
    pub refreshes: u64,
    /// Refreshes that failed.
    pub failed_refreshes: u64,
    /// Completion time of the last refresh attempt.
    pub last_refresh: Option<Instant>,
}

/// Handle to control a spawned poll loop.
pub struct PollHandle {
    stop_flag: Arc<AtomicBool>,
    wake: Arc<Notify>,
    status: Arc<RwLock<PollStatus>>,
    synchronizer: Arc<StatusSynchronizer>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Request the loop to stop. An in-flight refresh is abandoned.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    pub async fn status(&self) -> PollStatus {
        self.status.read().await.clone()
    }

    /// Stop polling, shut the synchronizer down and wait for the loop.
    pub async fn shutdown(self) {
        self.stop();
        self.synchronizer.shutdown();
        if let Err(err) = self.task.await {
            debug!(error = %err, "poll task ended abnormally");
        }
    }
}

pub struct PollScheduler;

impl PollScheduler {
    /// Spawn the poll loop. The first refresh runs immediately.
    pub fn spawn(synchronizer: Arc<StatusSynchronizer>, tick: Duration) -> PollHandle {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());
        let status = Arc::new(RwLock::new(PollStatus::default()));

        let task = tokio::spawn(run_loop(
            synchronizer.clone(),
            tick,
            stop_flag.clone(),
            wake.clone(),
            status.clone(),
        ));

        PollHandle {
            stop_flag,
            wake,
            status,
            synchronizer,
            task,
        }
    }
}

async fn run_loop(
    synchronizer: Arc<StatusSynchronizer>,
    tick: Duration,
    stop_flag: Arc<AtomicBool>,
    wake: Arc<Notify>,
    status: Arc<RwLock<PollStatus>>,
) {
    status.write().await.running = true;
    info!(tick_ms = tick.as_millis() as u64, "poll loop started");

    let mut timer = interval(tick);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut first = true;

    loop {
        tokio::select! {
            () = wake.notified() => break,
            _ = timer.tick() => {}
        }
        if stop_flag.load(Ordering::Acquire) || synchronizer.is_closed() {
            break;
        }

        status.write().await.ticks += 1;

        let due = first || synchronizer.is_refresh_due(synchronizer.now());
        first = false;
        if !due {
            continue;
        }

        let outcome = tokio::select! {
            () = wake.notified() => break,
            outcome = synchronizer.refresh() => outcome,
        };

        let mut status = status.write().await;
        status.refreshes += 1;
        status.last_refresh = Some(Instant::now());
        match outcome {
            Ok(state) => debug!(state = %state, "poll refresh completed"),
            Err(err) => {
                status.failed_refreshes += 1;
                debug!(error = %err, "poll refresh failed");
            }
        }
    }

    status.write().await.running = false;
    info!("poll loop stopped");
}
