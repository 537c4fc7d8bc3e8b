//! Text output formatting with optional colors.

use rosterstat_core::{CharacterRecord, ErrorKind, RunResult, RunSummary, SourceKind};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

/// Placeholder for an absent value.
const ABSENT: &str = "-";

/// Column widths: name, realm, role, spec, item level, M+, logs.
const WIDTHS: [usize; 7] = [14, 12, 7, 14, 7, 7, 9];

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats the full run: table, failures, summary and abort reason.
    pub fn format_run(&self, result: &RunResult) -> String {
        let mut lines = vec![self.format_header(), "─".repeat(self.table_width())];

        for record in &result.records {
            lines.push(self.format_record(record));
        }

        if !result.failures.is_empty() {
            lines.push(String::new());
            lines.push(self.bold("Failures"));
            for failure in &result.failures {
                lines.push(format!(
                    "  {}@{} {}: {} ({})",
                    failure.character,
                    failure.server,
                    failure.source.service_name(),
                    self.yellow(failure.kind.as_str()),
                    self.dim(&failure.message)
                ));
            }
        }

        lines.push(String::new());
        lines.push(self.format_summary(&result.summary()));

        if let Some(reason) = &result.aborted {
            lines.push(self.red(&format!("Run aborted: {reason}")));
        }

        lines.join("\n")
    }

    /// Formats the table header.
    pub fn format_header(&self) -> String {
        let cells = ["Character", "Realm", "Role", "Spec", "iLvl", "M+", "Logs"];
        let row = cells
            .iter()
            .zip(WIDTHS)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join(" ");
        format!("{} {}", self.bold(&row), self.bold("Failed"))
    }

    /// Formats one record as a table row.
    pub fn format_record(&self, record: &CharacterRecord) -> String {
        let cells = [
            record.name.clone(),
            record.server.clone(),
            record.role.to_string(),
            record.spec.clone().unwrap_or_else(|| ABSENT.to_string()),
            format_number(record.item_level),
            format_number(record.mythic_plus_score),
            format_logs(record),
        ];
        let row = cells
            .iter()
            .zip(WIDTHS)
            .map(|(cell, width)| pad(cell, width))
            .collect::<Vec<_>>()
            .join(" ");

        format!("{row} {}", self.format_failed(record))
    }

    /// Formats the summary block.
    pub fn format_summary(&self, summary: &RunSummary) -> String {
        let mut lines = vec![
            format!(
                "{} {} characters: {} complete, {} partial, {} empty",
                self.bold("Summary:"),
                summary.characters,
                self.green(&summary.complete.to_string()),
                self.yellow(&summary.partial.to_string()),
                self.red(&summary.empty.to_string())
            ),
            format!(
                "  Avg item level: {}  Avg M+: {}  Avg logs: {}",
                format_number(summary.average_item_level),
                format_number(summary.average_mythic_plus),
                format_number(summary.average_log_performance)
            ),
        ];

        if !summary.failures_by_kind.is_empty() {
            let counts = summary
                .failures_by_kind
                .iter()
                .map(|(kind, count)| format!("{} {count}", kind.as_str()))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("  Failures: {counts}"));
        }

        lines.join("\n")
    }

    fn format_failed(&self, record: &CharacterRecord) -> String {
        if record.failed_sources.is_empty() {
            return self.green("ok");
        }

        let failed = record
            .failed_sources
            .iter()
            .map(|(source, kind)| format!("{}:{}", short_source(*source), kind.as_str()))
            .collect::<Vec<_>>()
            .join(",");

        if record.failed_sources.values().any(|k| *k == ErrorKind::Cancelled) {
            self.red(&failed)
        } else {
            self.yellow(&failed)
        }
    }

    fn table_width(&self) -> usize {
        WIDTHS.iter().sum::<usize>() + WIDTHS.len() + "Failed".len()
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }
}

// ============================================================================
// Cell Helpers
// ============================================================================

/// Formats an optional number with one decimal, or the absent marker.
pub fn format_number(value: Option<f64>) -> String {
    value.map_or_else(|| ABSENT.to_string(), |v| format!("{v:.1}"))
}

/// Formats the logs cell.
///
/// `?` means the combat-log source failed; `none` means it succeeded and
/// the character has no logs.
fn format_logs(record: &CharacterRecord) -> String {
    match record.has_raid_logs() {
        None => "?".to_string(),
        Some(false) => "none".to_string(),
        Some(true) => format_number(
            record
                .log_performance
                .as_ref()
                .and_then(|l| l.best_average),
        ),
    }
}

fn short_source(source: SourceKind) -> &'static str {
    match source {
        SourceKind::Profile => "profile",
        SourceKind::MythicPlus => "m+",
        SourceKind::CombatLog => "logs",
    }
}

/// Pads by character count and truncates overlong cells.
fn pad(cell: &str, width: usize) -> String {
    let len = cell.chars().count();
    if len > width {
        let mut cut: String = cell.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    } else {
        format!("{cell}{}", " ".repeat(width - len))
    }
}
