//! Source kinds, the shared failure taxonomy, and partial records.
//!
//! Each upstream API owns a disjoint set of record fields. A successful
//! fetch yields one [`PartialRecord`] carrying a typed [`SourcePayload`];
//! a failed fetch yields no partial record at all.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Source Kind
// ============================================================================

/// The three upstream data sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Character profile: equipment, item level, spec.
    Profile,
    /// Mythic+ rating.
    MythicPlus,
    /// Raid combat-log rankings.
    CombatLog,
}

impl SourceKind {
    /// Returns all source kinds in merge order.
    pub fn all() -> &'static [SourceKind] {
        &[Self::Profile, Self::MythicPlus, Self::CombatLog]
    }

    /// Returns the snake-case name used in output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::MythicPlus => "mythic_plus",
            Self::CombatLog => "combat_log",
        }
    }

    /// Returns the upstream service name.
    pub fn service_name(&self) -> &'static str {
        match self {
            Self::Profile => "Blizzard",
            Self::MythicPlus => "Raider.IO",
            Self::CombatLog => "Warcraft Logs",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Error Kind
// ============================================================================

/// Classification of a source failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The character does not exist upstream.
    NotFound,
    /// The bearer token was rejected.
    Unauthorized,
    /// The upstream throttled the request.
    RateLimited,
    /// Network failure, timeout or 5xx.
    TransientNetwork,
    /// The request itself was rejected (4xx other than 401/403/404/429).
    MalformedRequest,
    /// The response could not be interpreted.
    MalformedResponse,
    /// The OAuth provider could not issue a token.
    AuthProviderDown,
    /// The run was cancelled before the source finished.
    Cancelled,
}

impl ErrorKind {
    /// Returns true if another attempt might succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized | Self::RateLimited | Self::TransientNetwork
        )
    }

    /// Returns true if this failure aborts the whole run.
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, Self::AuthProviderDown)
    }

    /// Returns the snake-case name used in output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::TransientNetwork => "transient_network",
            Self::MalformedRequest => "malformed_request",
            Self::MalformedResponse => "malformed_response",
            Self::AuthProviderDown => "auth_provider_down",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// One equipped item from the profile source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquippedItem {
    /// Slot type (e.g. `HEAD`, `MAIN_HAND`).
    pub slot: String,
    /// Item name.
    pub name: String,
    /// Item level, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_level: Option<u32>,
    /// Quality (e.g. `EPIC`), when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

impl EquippedItem {
    /// Returns true for cosmetic slots that do not count toward item level.
    pub fn is_cosmetic(&self) -> bool {
        matches!(self.slot.as_str(), "SHIRT" | "TABARD")
    }
}

/// Fields owned by the profile source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileData {
    /// Active specialization.
    pub spec: Option<String>,
    /// Equipped item level.
    pub item_level: Option<f64>,
    /// Equipped items. `None` when the equipment request failed.
    pub equipment: Option<Vec<EquippedItem>>,
}

/// Fields owned by the Mythic+ source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MythicPlusData {
    /// Overall rating. `None` means the season had no data.
    pub score: Option<f64>,
    /// Season the score belongs to.
    pub season: Option<String>,
}

/// Best performance against one raid encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossRanking {
    /// Encounter name.
    pub encounter: String,
    /// Best rank percentile.
    pub rank_percent: Option<f64>,
    /// Best DPS/HPS amount.
    pub best_amount: Option<f64>,
    /// Number of recorded kills.
    pub total_kills: u32,
}

/// One all-stars partition entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllStarEntry {
    /// Partition number.
    pub partition: Option<i64>,
    /// Specialization the points were earned with.
    pub spec: Option<String>,
    /// Points earned.
    pub points: Option<f64>,
    /// Maximum possible points.
    pub possible_points: Option<f64>,
    /// Rank percentile.
    pub rank_percent: Option<f64>,
}

/// Fields owned by the combat-log source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatLogData {
    /// Ranking metric (`dps` or `hps`).
    pub metric: String,
    /// False when the character exists but has no logged raids.
    pub has_logs: bool,
    /// Specialization reported by the logs.
    pub spec: Option<String>,
    /// Raid difficulty the numbers come from. Mythic (5) is preferred
    /// over heroic (4) when both are logged.
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

impl CombatLogData {
    /// Creates a "no logs" payload for the given metric.
    pub fn no_logs(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            ..Default::default()
        }
    }
}

/// Typed fields produced by one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SourcePayload {
    /// Profile source payload.
    Profile(ProfileData),
    /// Mythic+ source payload.
    MythicPlus(MythicPlusData),
    /// Combat-log source payload.
    CombatLog(CombatLogData),
}

impl SourcePayload {
    /// Returns the source that owns this payload.
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Profile(_) => SourceKind::Profile,
            Self::MythicPlus(_) => SourceKind::MythicPlus,
            Self::CombatLog(_) => SourceKind::CombatLog,
        }
    }
}

// ============================================================================
// Partial Record
// ============================================================================

/// The output of one source for one character, before merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialRecord {
    /// Producing source.
    pub source: SourceKind,
    /// Parsed fields.
    pub payload: SourcePayload,
    /// When the fetch completed.
    pub fetched_at: DateTime<Utc>,
    /// Number of HTTP attempts the fetch needed.
    pub attempts: u32,
}

impl PartialRecord {
    /// Creates a partial record stamped with the current time.
    pub fn new(payload: SourcePayload, attempts: u32) -> Self {
        Self {
            source: payload.kind(),
            payload,
            fetched_at: Utc::now(),
            attempts,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_classes() {
        assert!(ErrorKind::TransientNetwork.is_recoverable());
        assert!(ErrorKind::RateLimited.is_recoverable());
        assert!(ErrorKind::Unauthorized.is_recoverable());
        assert!(!ErrorKind::NotFound.is_recoverable());
        assert!(!ErrorKind::MalformedResponse.is_recoverable());
        assert!(!ErrorKind::Cancelled.is_recoverable());

        assert!(ErrorKind::AuthProviderDown.is_run_fatal());
        assert!(!ErrorKind::NotFound.is_run_fatal());
    }

    #[test]
    fn test_partial_record_source_follows_payload() {
        let partial = PartialRecord::new(
            SourcePayload::MythicPlus(MythicPlusData {
                score: Some(2500.0),
                season: Some("season-tww-2".to_string()),
            }),
            1,
        );
        assert_eq!(partial.source, SourceKind::MythicPlus);
    }

    #[test]
    fn test_cosmetic_slots() {
        let shirt = EquippedItem {
            slot: "SHIRT".to_string(),
            name: "Lucky Shirt".to_string(),
            item_level: Some(1),
            quality: None,
        };
        assert!(shirt.is_cosmetic());
    }
}
