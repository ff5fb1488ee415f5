//! CLI output: rendering of outcomes, cursors and errors.

use crate::cli::parse::OutputFormat;
use crate::dispatch::{DispatchCursor, RunOutcome};
use crate::error::DispatchError;
use serde_json::json;

/// Map dispatcher errors to a string for CLI output.
pub fn map_error(e: &DispatchError) -> String {
    e.to_string()
}

pub fn format_outcome(outcome: &RunOutcome, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => outcome.to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(outcome)
            .unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string()),
    }
}

pub fn format_cursor(cursor: Option<&DispatchCursor>, format: OutputFormat) -> String {
    match (cursor, format) {
        (None, OutputFormat::Text) => "No dispatch cursor persisted yet".to_string(),
        (Some(c), OutputFormat::Text) => format!(
            "checkpointTimestamp: {}\nbudgetRemaining: {}",
            c.checkpoint, c.budget_remaining
        ),
        (cursor, OutputFormat::Json) => json!({
            "checkpointTimestamp": cursor.map(|c| c.checkpoint),
            "budgetRemaining": cursor.map(|c| c.budget_remaining),
        })
        .to_string(),
    }
}
