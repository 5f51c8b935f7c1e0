//! Output formatting utilities for the CLI.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use console::style;
use serde::Serialize;
use serde_json::json;
use std::env;
use tracing::debug;

use crate::domain::models::UiMatchingStatus;
use crate::domain::ports::GatewayError;
use crate::infrastructure::backend::ErrorClassifier;
use crate::services::StepFailure;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Print a sanitized error and exit non-zero.
///
/// Step failures keep their step name; everything else is reduced to the
/// classifier's user message. The full chain only goes to the debug log.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    debug!(error = ?err, "command failed");

    let (step, message, retryable) = match err.downcast_ref::<StepFailure>() {
        Some(failure) => (
            Some(failure.step.as_str()),
            failure.user_message.clone(),
            failure.retryable,
        ),
        None => {
            let classification = ErrorClassifier::classify_anyhow(&err);
            let message = if err.chain().any(|cause| cause.is::<GatewayError>()) {
                classification.user_message.to_string()
            } else {
                err.to_string()
            };
            (None, message, classification.retryable)
        }
    };

    if json_mode {
        let body = json!({
            "success": false,
            "step": step,
            "error": message,
            "retryable": retryable,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        match step {
            Some(step) => eprintln!("{} {step}: {message}", style("Error:").red().bold()),
            None => eprintln!("{} {message}", style("Error:").red().bold()),
        }
    }
    std::process::exit(1);
}

/// Borderless two-column table for key/value details.
pub fn detail_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Table with a bold header row.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
        );
    table
}

/// Cell for a UI state, colored unless the terminal opts out.
pub fn state_cell(state: UiMatchingStatus) -> Cell {
    let cell = Cell::new(state.as_str());
    if supports_color() {
        cell.fg(state_color(state)).add_attribute(Attribute::Bold)
    } else {
        cell
    }
}

fn state_color(state: UiMatchingStatus) -> Color {
    match state {
        UiMatchingStatus::Loading => Color::DarkGrey,
        UiMatchingStatus::NotEligible => Color::Red,
        UiMatchingStatus::Eligible => Color::White,
        UiMatchingStatus::Processing => Color::Cyan,
        UiMatchingStatus::Waiting => Color::Yellow,
        UiMatchingStatus::Matched => Color::Green,
    }
}

fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

/// Truncate a string to a maximum number of characters, appending "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer string", 10), "a much ...");
        assert_eq!(truncate("ééééééééééé", 5), "éé...");
    }
}
