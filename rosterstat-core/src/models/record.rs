//! The merged per-character record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::roster::{Role, RosterEntry};
use super::source::{
    AllStarEntry, BossRanking, CombatLogData, EquippedItem, ErrorKind, PartialRecord, SourceKind,
    SourcePayload,
};

// ============================================================================
// Log Performance
// ============================================================================

/// Raid performance taken from the combat-log source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogPerformance {
    /// Ranking metric (`dps` or `hps`).
    pub metric: String,
    /// Raid difficulty the numbers come from (5 mythic, 4 heroic).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u32>,
    /// Best performance average.
    pub best_average: Option<f64>,
    /// Median performance average.
    pub median_average: Option<f64>,
    /// Per-encounter rankings.
    pub rankings: Vec<BossRanking>,
    /// All-stars entries.
    pub all_stars: Vec<AllStarEntry>,
}

impl From<&CombatLogData> for LogPerformance {
    fn from(data: &CombatLogData) -> Self {
        Self {
            metric: data.metric.clone(),
            difficulty: data.difficulty,
            best_average: data.best_average,
            median_average: data.median_average,
            rankings: data.rankings.clone(),
            all_stars: data.all_stars.clone(),
        }
    }
}

// ============================================================================
// Spec Precedence
// ============================================================================

/// Picks the specialization label for a character.
///
/// The combat-log spec wins when present; otherwise the profile spec is used.
pub fn resolve_spec(profile_spec: Option<&str>, log_spec: Option<&str>) -> Option<String> {
    let non_empty = |s: &&str| !s.trim().is_empty();
    log_spec
        .filter(non_empty)
        .or_else(|| profile_spec.filter(non_empty))
        .map(str::to_string)
}

// ============================================================================
// Character Record
// ============================================================================

/// Merged statistics for one roster entry.
///
/// Every data field is `None` when its source failed or had nothing to
/// report. Failed sources are listed in `failed_sources`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRecord {
    /// Character name.
    pub name: String,
    /// Realm slug.
    pub server: String,
    /// Raid role.
    pub role: Role,
    /// Class name.
    pub class_name: String,
    /// Resolved specialization.
    pub spec: Option<String>,
    /// Equipped item level.
    pub item_level: Option<f64>,
    /// Mythic+ rating.
    pub mythic_plus_score: Option<f64>,
    /// Season of the Mythic+ rating.
    pub mythic_plus_season: Option<String>,
    /// Raid performance; `None` with a successful combat-log source means no logs.
    pub log_performance: Option<LogPerformance>,
    /// Equipped items.
    pub equipment: Option<Vec<EquippedItem>>,
    /// Sources that failed, with their failure class.
    pub failed_sources: BTreeMap<SourceKind, ErrorKind>,
    /// Number of aggregation passes used.
    pub passes: u32,
}

impl CharacterRecord {
    /// Creates a record with every data field absent.
    pub fn empty(entry: &RosterEntry) -> Self {
        Self {
            name: entry.name.clone(),
            server: entry.server_slug.clone(),
            role: entry.role,
            class_name: entry.class_name.clone(),
            spec: None,
            item_level: None,
            mythic_plus_score: None,
            mythic_plus_season: None,
            log_performance: None,
            equipment: None,
            failed_sources: BTreeMap::new(),
            passes: 0,
        }
    }

    /// Creates a record where every source failed with the same error kind.
    pub fn all_failed(entry: &RosterEntry, kind: ErrorKind) -> Self {
        let mut record = Self::empty(entry);
        record.failed_sources = SourceKind::all().iter().map(|s| (*s, kind)).collect();
        record
    }

    /// Merges successful partial records into one record.
    ///
    /// Each payload writes only the fields its source owns, so the result
    /// does not depend on the order of `partials`. A source listed in
    /// `failed` that also produced a partial record is treated as succeeded.
    pub fn merge<'a>(
        entry: &RosterEntry,
        partials: impl IntoIterator<Item = &'a PartialRecord>,
        mut failed: BTreeMap<SourceKind, ErrorKind>,
        passes: u32,
    ) -> Self {
        let mut record = Self::empty(entry);
        let mut profile_spec = None;
        let mut log_spec = None;

        for partial in partials {
            failed.remove(&partial.source);
            match &partial.payload {
                SourcePayload::Profile(profile) => {
                    record.item_level = profile.item_level;
                    record.equipment.clone_from(&profile.equipment);
                    profile_spec = profile.spec.clone();
                }
                SourcePayload::MythicPlus(mplus) => {
                    record.mythic_plus_score = mplus.score;
                    record.mythic_plus_season = mplus.season.clone();
                }
                SourcePayload::CombatLog(logs) => {
                    log_spec = logs.spec.clone();
                    if logs.has_logs {
                        record.log_performance = Some(LogPerformance::from(logs));
                    }
                }
            }
        }

        record.spec = resolve_spec(profile_spec.as_deref(), log_spec.as_deref());
        record.failed_sources = failed;
        record.passes = passes;
        record
    }

    /// Returns true if no source failed.
    pub fn is_complete(&self) -> bool {
        self.failed_sources.is_empty()
    }

    /// Returns true if at least one data field is present.
    pub fn has_any_data(&self) -> bool {
        self.item_level.is_some()
            || self.mythic_plus_score.is_some()
            || self.log_performance.is_some()
            || self.equipment.is_some()
    }

    /// Returns whether the character has raid logs.
    ///
    /// `None` when the combat-log source failed, so "no logs" and
    /// "unreachable" are never the same answer.
    pub fn has_raid_logs(&self) -> Option<bool> {
        if self.failed_sources.contains_key(&SourceKind::CombatLog) {
            None
        } else {
            Some(self.log_performance.is_some())
        }
    }

    /// Returns true if a source failed with a run-fatal error.
    pub fn has_run_fatal_failure(&self) -> bool {
        self.failed_sources.values().any(ErrorKind::is_run_fatal)
    }
}

// ============================================================================
// Tests
// ============================================================================
