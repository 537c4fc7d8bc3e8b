//! JSON output formatting.

use anyhow::Result;
use rosterstat_core::{RunResult, RunSummary};
use serde::Serialize;

// ============================================================================
// Output Types
// ============================================================================

/// A run result together with its summary.
#[derive(Debug, Serialize)]
pub struct RunOutput<'a> {
    /// The run itself.
    #[serde(flatten)]
    pub result: &'a RunResult,
    /// Roster-wide statistics.
    pub summary: RunSummary,
}

impl<'a> RunOutput<'a> {
    /// Wraps a run result and computes its summary.
    pub fn new(result: &'a RunResult) -> Self {
        Self {
            result,
            summary: result.summary(),
        }
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a run result with its summary.
    pub fn format_run(&self, result: &RunResult) -> Result<String> {
        self.format(&RunOutput::new(result))
    }
}
