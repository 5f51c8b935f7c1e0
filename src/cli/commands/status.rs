//! Matching state commands: status, opt-in, opt-out, watch.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use comfy_table::Cell;
use console::style;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

use crate::cli::output::{detail_table, output, state_cell, CommandOutput};
use crate::domain::models::{SyncSnapshot, UiMatchingStatus};
use crate::infrastructure::setup::Services;
use crate::services::{format_wait_time, PollScheduler};

#[derive(Debug, Serialize)]
pub struct MatchOutput {
    pub partner_id: String,
    pub score: f64,
    pub cycle_id: String,
    pub channel_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ActionOutput {
    pub action: &'static str,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub state: UiMatchingStatus,
    pub wait_time_minutes: u64,
    pub wait_time: String,
    pub opt_in_timestamp: Option<DateTime<Utc>>,
    pub missed_cycles: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_match: Option<MatchOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traits: Option<String>,
    pub last_refresh: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionOutput>,
}

impl StatusOutput {
    fn from_snapshot(snapshot: &SyncSnapshot, user_id: Option<&str>) -> Self {
        let current_match = snapshot.current_match.as_ref().map(|pair| MatchOutput {
            partner_id: user_id
                .map_or(pair.user2_id.as_str(), |me| pair.partner_of(me))
                .to_string(),
            score: pair.score,
            cycle_id: pair.cycle_id.clone(),
            channel_id: pair.channel_id.clone(),
            created_at: pair.created_at,
        });

        Self {
            state: snapshot.ui_status,
            wait_time_minutes: snapshot.wait_time_minutes,
            wait_time: format_wait_time(snapshot.wait_time_minutes),
            opt_in_timestamp: snapshot.status.as_ref().and_then(|s| s.opt_in_timestamp),
            missed_cycles: snapshot
                .status
                .as_ref()
                .map_or(0, |s| s.missed_cycles_count),
            current_match,
            traits: snapshot
                .user_traits
                .as_ref()
                .filter(|t| t.has_traits())
                .map(|t| t.traits.clone()),
            last_refresh: snapshot.last_refresh,
            last_error: snapshot.last_error.clone(),
            action: None,
        }
    }

    fn with_action(mut self, action: &'static str, success: bool) -> Self {
        self.action = Some(ActionOutput { action, success });
        self
    }
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();

        if let Some(action) = &self.action {
            let verdict = if action.success {
                style("ok").green().bold()
            } else {
                style("rejected").red().bold()
            };
            lines.push(format!("{}: {verdict}", action.action));
        }

        let mut table = detail_table();
        table.add_row(vec![Cell::new("State"), state_cell(self.state)]);

        if self.state.is_queued() {
            table.add_row(vec!["Waiting for", self.wait_time.as_str()]);
        }
        if self.missed_cycles > 0 {
            table.add_row(vec!["Missed cycles".to_string(), self.missed_cycles.to_string()]);
        }
        if let Some(pair) = &self.current_match {
            table.add_row(vec!["Partner".to_string(), pair.partner_id.clone()]);
            table.add_row(vec!["Score".to_string(), format!("{:.0}%", pair.score * 100.0)]);
            table.add_row(vec!["Cycle".to_string(), pair.cycle_id.clone()]);
        }
        if let Some(traits) = &self.traits {
            table.add_row(vec!["Traits", traits.as_str()]);
        }
        if let Some(at) = self.last_refresh {
            table.add_row(vec![
                "Last refresh".to_string(),
                at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            ]);
        }
        lines.push(table.to_string());

        if let Some(error) = &self.last_error {
            lines.push(format!("{} {error}", style("!").yellow().bold()));
        }
        lines.join("\n")
    }
}

fn current_user_id(services: &Services) -> Option<String> {
    services.identity.current_session().map(|s| s.user_id)
}

/// Synchronize once; fail only if no pass has ever succeeded.
async fn synchronize(services: &Services) -> Result<SyncSnapshot> {
    if let Err(err) = services.synchronizer.refresh().await {
        warn!(error = %err, "refresh failed");
    }
    let snapshot = services.synchronizer.snapshot();
    if snapshot.ui_status == UiMatchingStatus::Loading {
        bail!(
            "{}",
            snapshot
                .last_error
                .unwrap_or_else(|| "Could not reach the matching service".to_string())
        );
    }
    Ok(snapshot)
}

pub async fn status(services: &Services, json: bool) -> Result<()> {
    let snapshot = synchronize(services).await?;
    let user_id = current_user_id(services);
    output(&StatusOutput::from_snapshot(&snapshot, user_id.as_deref()), json);
    Ok(())
}

pub async fn opt_in(services: &Services, json: bool) -> Result<()> {
    synchronize(services).await?;
    let success = services.synchronizer.opt_in().await;

    let snapshot = services.synchronizer.snapshot();
    let user_id = current_user_id(services);
    output(
        &StatusOutput::from_snapshot(&snapshot, user_id.as_deref()).with_action("opt-in", success),
        json,
    );
    Ok(())
}

pub async fn opt_out(services: &Services, json: bool) -> Result<()> {
    synchronize(services).await?;
    let success = services.synchronizer.opt_out().await;

    let snapshot = services.synchronizer.snapshot();
    let user_id = current_user_id(services);
    output(
        &StatusOutput::from_snapshot(&snapshot, user_id.as_deref()).with_action("opt-out", success),
        json,
    );
    Ok(())
}

/// Poll until Ctrl-C, printing each published snapshot whose state or
/// refresh time changed.
pub async fn watch(services: &Services, tick: Option<Duration>, json: bool) -> Result<()> {
    let tick = tick.unwrap_or_else(|| services.config.poll_tick());
    let mut updates = services.synchronizer.subscribe();
    let handle = PollScheduler::spawn(services.synchronizer.clone(), tick);
    let user_id = current_user_id(services);

    if !json {
        eprintln!(
            "{} every {}s, Ctrl-C to stop",
            style("Watching").bold(),
            tick.as_secs()
        );
    }

    let mut last_seen: Option<(UiMatchingStatus, Option<DateTime<Utc>>)> = None;
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                let key = (snapshot.ui_status, snapshot.last_refresh);
                if last_seen == Some(key) {
                    continue;
                }
                last_seen = Some(key);

                let out = StatusOutput::from_snapshot(&snapshot, user_id.as_deref());
                if json {
                    println!("{}", serde_json::to_string(&out)?);
                } else {
                    println!("{}\n", out.to_human());
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let status = handle.status().await;
    handle.shutdown().await;
    if !json {
        eprintln!(
            "Stopped after {} refresh(es), {} failed",
            status.refreshes, status.failed_refreshes
        );
    }
    Ok(())
}
