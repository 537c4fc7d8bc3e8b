//! Run output types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::CharacterRecord;
use super::source::{ErrorKind, SourceKind};

// ============================================================================
// Failures
// ============================================================================

/// One failed source fetch for one character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    /// Character name.
    pub character: String,
    /// Realm slug.
    pub server: String,
    /// Failed source.
    pub source: SourceKind,
    /// Failure class.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub message: String,
}

/// Why a run stopped before every character was fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AbortReason {
    /// The run-level timeout expired.
    Timeout {
        /// Configured timeout in seconds.
        after_secs: u64,
    },
    /// An OAuth provider could not issue a token.
    AuthProviderDown {
        /// Character whose fetch hit the failure.
        character: String,
        /// Source whose token endpoint failed.
        source: SourceKind,
        /// Error detail.
        message: String,
    },
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout { after_secs } => write!(f, "run timed out after {after_secs}s"),
            Self::AuthProviderDown {
                character,
                source,
                message,
            } => write!(
                f,
                "{} token endpoint down while fetching {character}: {message}",
                source.service_name()
            ),
        }
    }
}

// ============================================================================
// Run Result
// ============================================================================

/// Output of one roster run.
///
/// `records` holds exactly one record per roster entry, in roster order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// One record per roster entry.
    pub records: Vec<CharacterRecord>,
    /// Every source failure observed during the run.
    pub failures: Vec<SourceFailure>,
    /// Set when the run stopped early.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted: Option<AbortReason>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    /// Returns true if the run stopped early.
    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    /// Looks up a record by character name.
    pub fn record(&self, name: &str) -> Option<&CharacterRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Returns the failures recorded for one character.
    pub fn failures_for(&self, name: &str) -> Vec<&SourceFailure> {
        self.failures.iter().filter(|f| f.character == name).collect()
    }

    /// Computes roster-wide averages and completeness counts.
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_records(&self.records, &self.failures)
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Roster-wide statistics over present values only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of records.
    pub characters: usize,
    /// Records with data and no failed source.
    pub complete: usize,
    /// Records with some data and at least one failed source.
    pub partial: usize,
    /// Records with no data at all, whether or not a source failed.
    pub empty: usize,
    /// Average item level.
    pub average_item_level: Option<f64>,
    /// Average Mythic+ rating.
    pub average_mythic_plus: Option<f64>,
    /// Average best log performance.
    pub average_log_performance: Option<f64>,
    /// Failure counts by class.
    pub failures_by_kind: BTreeMap<ErrorKind, usize>,
}

impl RunSummary {
    /// Builds a summary from records and failures.
    ///
    /// Every record lands in exactly one of `complete`, `partial` and
    /// `empty`. A record whose sources all succeeded without returning
    /// anything counts as empty.
    pub fn from_records(records: &[CharacterRecord], failures: &[SourceFailure]) -> Self {
        let mut failures_by_kind = BTreeMap::new();
        for failure in failures {
            *failures_by_kind.entry(failure.kind).or_insert(0) += 1;
        }

        let (mut complete, mut partial, mut empty) = (0, 0, 0);
        for record in records {
            match (record.has_any_data(), record.is_complete()) {
                (false, _) => empty += 1,
                (true, true) => complete += 1,
                (true, false) => partial += 1,
            }
        }

        Self {
            characters: records.len(),
            complete,
            partial,
            empty,
            average_item_level: mean(records.iter().filter_map(|r| r.item_level)),
            average_mythic_plus: mean(records.iter().filter_map(|r| r.mythic_plus_score)),
            average_log_performance: mean(
                records
                    .iter()
                    .filter_map(|r| r.log_performance.as_ref())
                    .filter_map(|l| l.best_average),
            ),
            failures_by_kind,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

// ============================================================================
// Tests
// ============================================================================
