//! Blizzard profile response parser.
//!
//! Localized fields arrive either as a plain string (when a `locale` query
//! parameter was sent) or as a map of every locale. Both shapes are accepted.

use std::collections::BTreeMap;

use rosterstat_core::EquippedItem;
use rosterstat_fetch::FetchError;
use serde::Deserialize;
use tracing::debug;

// ============================================================================
// Response Types
// ============================================================================

/// A localized string in either of its two wire shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum LocalizedString {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl LocalizedString {
    fn resolve(&self, locale: &str) -> Option<String> {
        match self {
            Self::Plain(s) => Some(s.clone()),
            Self::Localized(map) => map
                .get(locale)
                .or_else(|| map.get("en_US"))
                .or_else(|| map.values().next())
                .cloned(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    #[serde(default)]
    name: Option<LocalizedString>,
}

#[derive(Debug, Deserialize)]
struct TypeRef {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    name: Option<LocalizedString>,
}

#[derive(Debug, Deserialize)]
struct LevelRef {
    #[serde(default)]
    value: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    active_spec: Option<NamedRef>,
    #[serde(default)]
    equipped_item_level: Option<f64>,
    #[serde(default)]
    average_item_level: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct EquipmentResponse {
    #[serde(default)]
    equipped_items: Vec<ItemResponse>,
}

#[derive(Debug, Deserialize)]
struct ItemResponse {
    #[serde(default)]
    slot: Option<TypeRef>,
    #[serde(default)]
    name: Option<LocalizedString>,
    #[serde(default)]
    level: Option<LevelRef>,
    #[serde(default)]
    quality: Option<TypeRef>,
}

// ============================================================================
// Parsed Summary
// ============================================================================

/// Fields taken from the character summary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSummary {
    /// Active specialization name.
    pub spec: Option<String>,
    /// Item level of equipped gear.
    pub equipped_item_level: Option<f64>,
    /// Average item level across bags.
    pub average_item_level: Option<f64>,
}

// ============================================================================
// Parsers
// ============================================================================

/// Parses the character summary.
pub fn parse_summary(json: &str, locale: &str) -> Result<ProfileSummary, FetchError> {
    debug!(len = json.len(), "Parsing profile summary");

    let response: SummaryResponse = serde_json::from_str(json)
        .map_err(|e| FetchError::InvalidResponse(format!("profile summary: {e}")))?;

    Ok(ProfileSummary {
        spec: response
            .active_spec
            .and_then(|s| s.name)
            .and_then(|n| n.resolve(locale))
            .filter(|s| !s.trim().is_empty()),
        equipped_item_level: response.equipped_item_level.filter(|v| *v > 0.0),
        average_item_level: response.average_item_level.filter(|v| *v > 0.0),
    })
}

/// Parses the equipped item list.
pub fn parse_equipment(json: &str, locale: &str) -> Result<Vec<EquippedItem>, FetchError> {
    debug!(len = json.len(), "Parsing equipment");

    let response: EquipmentResponse = serde_json::from_str(json)
        .map_err(|e| FetchError::InvalidResponse(format!("equipment: {e}")))?;

    Ok(response
        .equipped_items
        .into_iter()
        .map(|item| {
            let slot = item.slot.as_ref();
            EquippedItem {
                slot: slot
                    .and_then(|s| s.kind.clone())
                    .or_else(|| slot.and_then(|s| s.name.as_ref()).and_then(|n| n.resolve(locale)))
                    .unwrap_or_default(),
                name: item
                    .name
                    .and_then(|n| n.resolve(locale))
                    .unwrap_or_default(),
                item_level: item.level.and_then(|l| l.value),
                quality: item.quality.and_then(|q| q.kind),
            }
        })
        .collect())
}

/// Picks the character's item level.
///
/// Prefers the summary's equipped item level, then its average item level,
/// then the mean level of equipped items excluding shirt and tabard.
pub fn resolve_item_level(summary: &ProfileSummary, equipment: &[EquippedItem]) -> Option<f64> {
    summary
        .equipped_item_level
        .or(summary.average_item_level)
        .or_else(|| mean_item_level(equipment))
}

/// Mean level of non-cosmetic items, rounded to one decimal.
pub fn mean_item_level(equipment: &[EquippedItem]) -> Option<f64> {
    let levels: Vec<f64> = equipment
        .iter()
        .filter(|item| !item.is_cosmetic())
        .filter_map(|item| item.item_level)
        .map(f64::from)
        .collect();

    if levels.is_empty() {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let mean = levels.iter().sum::<f64>() / levels.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY: &str = r#"{
        "name": "Alpha",
        "active_spec": {"id": 63, "name": "화염"},
        "equipped_item_level": 639,
        "average_item_level": 641
    }"#;

    const EQUIPMENT: &str = r#"{
        "equipped_items": [
            {"slot": {"type": "HEAD", "name": "머리"}, "name": "Crown", "level": {"value": 639}, "quality": {"type": "EPIC"}},
            {"slot": {"type": "SHIRT", "name": "속옷"}, "name": "Shirt", "level": {"value": 1}},
            {"slot": {"type": "CHEST", "name": "가슴"}, "name": "Robe", "level": {"value": 636}},
            {"slot": {"type": "TABARD", "name": "겉옷"}, "name": "Tabard", "level": {"value": 1}}
        ]
    }"#;

    #[test]
    fn test_parse_summary() {
        let summary = parse_summary(SUMMARY, "ko_KR").unwrap();
        assert_eq!(summary.spec.as_deref(), Some("화염"));
        assert_eq!(summary.equipped_item_level, Some(639.0));
        assert_eq!(summary.average_item_level, Some(641.0));
    }

    #[test]
    fn test_parse_localized_map() {
        let json = r#"{"active_spec": {"name": {"en_US": "Fire", "ko_KR": "화염"}}}"#;
        assert_eq!(
            parse_summary(json, "ko_KR").unwrap().spec.as_deref(),
            Some("화염")
        );
        assert_eq!(
            parse_summary(json, "de_DE").unwrap().spec.as_deref(),
            Some("Fire")
        );
    }

    #[test]
    fn test_parse_equipment() {
        let items = parse_equipment(EQUIPMENT, "ko_KR").unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].slot, "HEAD");
        assert_eq!(items[0].quality.as_deref(), Some("EPIC"));
        assert!(items[1].is_cosmetic());
    }

    #[test]
    fn test_mean_excludes_cosmetic_slots() {
        let items = parse_equipment(EQUIPMENT, "ko_KR").unwrap();
        assert_eq!(mean_item_level(&items), Some(637.5));
    }

    #[test]
    fn test_item_level_precedence() {
        let items = parse_equipment(EQUIPMENT, "ko_KR").unwrap();
        let mut summary = parse_summary(SUMMARY, "ko_KR").unwrap();
        assert_eq!(resolve_item_level(&summary, &items), Some(639.0));

        summary.equipped_item_level = None;
        assert_eq!(resolve_item_level(&summary, &items), Some(641.0));

        summary.average_item_level = None;
        assert_eq!(resolve_item_level(&summary, &items), Some(637.5));

        assert_eq!(resolve_item_level(&summary, &[]), None);
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = parse_summary("<html>", "ko_KR").unwrap_err();
        assert_eq!(err.kind(), rosterstat_core::ErrorKind::MalformedResponse);
    }
}
