//! JSON reporter
//!
//! Outputs the full run summary as pretty-printed JSON.
//! Useful for machine consumption, piping to jq, or further processing.

use crate::pipeline::RunSummary;
use anyhow::Result;

/// Render summary as JSON
pub fn render(summary: &RunSummary) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}

/// Render summary as compact JSON (single line)
#[allow(dead_code)] // Public API helper
pub fn render_compact(summary: &RunSummary) -> Result<String> {
    Ok(serde_json::to_string(summary)?)
}
