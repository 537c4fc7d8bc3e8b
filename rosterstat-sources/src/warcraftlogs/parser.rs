//! Warcraft Logs GraphQL response parser.
//!
//! `zoneRankings` is a JSON scalar in the schema. Depending on the client it
//! arrives as an object or as a JSON-encoded string; both are accepted.
//!
//! Two layouts are understood:
//!
//! * flat: averages, a per-boss list under `ranks`, `rankings` or
//!   `encounterRankings` (first non-empty wins, in that order) and `allStars`
//! * nested: zone id, then difficulty, then optionally metric, each level an
//!   object keyed by that value, with the flat layout at the bottom. The
//!   latest zone is used and mythic (5) wins over heroic (4).
//!
//! Anything else is a malformed response, never "no logs".

use rosterstat_core::{AllStarEntry, BossRanking, CombatLogData};
use rosterstat_fetch::FetchError;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Error message fragment for characters or realms WCL does not know.
const DOES_NOT_EXIST: &str = "does not exist";

/// Keys that identify the flat layout.
const FLAT_KEYS: [&str; 6] = [
    "bestPerformanceAverage",
    "medianPerformanceAverage",
    "ranks",
    "rankings",
    "encounterRankings",
    "allStars",
];

/// Difficulty ids, in order of preference.
const MYTHIC: u32 = 5;
const HEROIC: u32 = 4;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<ResponseData>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseData {
    #[serde(default)]
    character_data: Option<CharacterData>,
}

#[derive(Debug, Deserialize)]
struct CharacterData {
    #[serde(default)]
    character: Option<CharacterField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CharacterField {
    #[serde(default)]
    zone_rankings: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZoneRankings {
    #[serde(default)]
    best_performance_average: Option<f64>,
    #[serde(default)]
    median_performance_average: Option<f64>,
    #[serde(default)]
    difficulty: Option<u32>,
    #[serde(default)]
    ranks: Vec<RankingEntry>,
    #[serde(default)]
    rankings: Vec<RankingEntry>,
    #[serde(default)]
    encounter_rankings: Vec<RankingEntry>,
    #[serde(default)]
    all_stars: Vec<AllStarsEntry>,
}

impl ZoneRankings {
    /// Per-boss entries from the first non-empty list.
    fn entries(&self) -> &[RankingEntry] {
        [&self.ranks, &self.rankings, &self.encounter_rankings]
            .into_iter()
            .find(|list| !list.is_empty())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn has_logs(&self) -> bool {
        self.best_performance_average.is_some()
            || self.entries().iter().any(|r| r.total_kills.unwrap_or(0) > 0)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RankingEntry {
    #[serde(default)]
    encounter: Option<Encounter>,
    #[serde(default)]
    encounter_name: Option<String>,
    #[serde(default)]
    rank_percent: Option<f64>,
    #[serde(default)]
    best_amount: Option<f64>,
    #[serde(default)]
    total_kills: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Encounter {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllStarsEntry {
    #[serde(default)]
    partition: Option<i64>,
    #[serde(default)]
    spec: Option<String>,
    #[serde(default)]
    points: Option<f64>,
    #[serde(default)]
    possible_points: Option<f64>,
    #[serde(default)]
    rank_percent: Option<f64>,
}

// ============================================================================
// Parser
// ============================================================================

/// Parses a zone rankings response.
///
/// A null character is a valid "no logs" answer. A non-empty `errors` array
/// fails even though the HTTP status was 200.
pub fn parse_character_rankings(
    json: &str,
    metric: &str,
    url: &str,
) -> Result<CombatLogData, FetchError> {
    debug!(len = json.len(), "Parsing zone rankings");

    let response: GraphQlResponse = serde_json::from_str(json)
        .map_err(|e| FetchError::InvalidResponse(format!("warcraft logs: {e}")))?;

    if let Some(error) = response.errors.as_ref().and_then(|errors| errors.first()) {
        let message = error.message.as_deref().unwrap_or("unknown GraphQL error");
        warn!(error = message, "GraphQL error");
        if message.to_lowercase().contains(DOES_NOT_EXIST) {
            return Err(FetchError::NotFound {
                url: format!("{url} ({message})"),
            });
        }
        return Err(FetchError::InvalidResponse(format!("GraphQL error: {message}")));
    }

    let data = response
        .data
        .ok_or_else(|| FetchError::InvalidResponse("GraphQL response has no data".to_string()))?;

    let Some(character) = data.character_data.and_then(|c| c.character) else {
        debug!("Character unknown to Warcraft Logs, no logs");
        return Ok(CombatLogData::no_logs(metric));
    };

    let value = match character.zone_rankings {
        None | Some(Value::Null) => return Ok(CombatLogData::no_logs(metric)),
        Some(Value::String(encoded)) => serde_json::from_str::<Value>(&encoded)
            .map_err(|e| FetchError::InvalidResponse(format!("zoneRankings: {e}")))?,
        Some(value) => value,
    };

    match select_rankings(value, metric)? {
        Some(rankings) => Ok(into_combat_log(rankings, metric)),
        None => Ok(CombatLogData::no_logs(metric)),
    }
}

/// Finds the rankings block in either layout.
///
/// `None` means a nested payload with neither mythic nor heroic logs.
fn select_rankings(value: Value, metric: &str) -> Result<Option<ZoneRankings>, FetchError> {
    let Value::Object(map) = value else {
        return Err(FetchError::InvalidResponse(
            "zoneRankings is not an object".to_string(),
        ));
    };

    if FLAT_KEYS.iter().any(|key| map.contains_key(*key)) {
        return parse_block(&Value::Object(map)).map(Some);
    }

    let nested = !map.is_empty()
        && map
            .iter()
            .all(|(key, value)| key.parse::<u32>().is_ok() && value.is_object());
    if nested {
        return select_nested(map, metric);
    }

    Err(FetchError::InvalidResponse(
        "zoneRankings matches no known layout".to_string(),
    ))
}

fn select_nested(
    zones: Map<String, Value>,
    metric: &str,
) -> Result<Option<ZoneRankings>, FetchError> {
    let Some((zone, difficulties)) = zones
        .into_iter()
        .max_by_key(|(key, _)| key.parse::<u32>().unwrap_or(0))
    else {
        return Ok(None);
    };

    for difficulty in [MYTHIC, HEROIC] {
        let Some(block) = difficulties.get(difficulty.to_string()) else {
            continue;
        };
        let block = block
            .get(metric.to_lowercase())
            .filter(|v| v.is_object())
            .unwrap_or(block);

        let mut rankings = parse_block(block)?;
        if rankings.has_logs() {
            debug!(zone = %zone, difficulty, "Using nested zone rankings");
            rankings.difficulty.get_or_insert(difficulty);
            return Ok(Some(rankings));
        }
    }

    debug!(zone = %zone, "No mythic or heroic rankings");
    Ok(None)
}

fn parse_block(block: &Value) -> Result<ZoneRankings, FetchError> {
    ZoneRankings::deserialize(block)
        .map_err(|e| FetchError::InvalidResponse(format!("zoneRankings: {e}")))
}

fn into_combat_log(rankings: ZoneRankings, metric: &str) -> CombatLogData {
    let has_logs = rankings.has_logs();

    let bosses: Vec<BossRanking> = rankings
        .entries()
        .iter()
        .map(|r| BossRanking {
            encounter: r
                .encounter
                .as_ref()
                .and_then(|e| e.name.clone())
                .or_else(|| r.encounter_name.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            rank_percent: r.rank_percent,
            best_amount: r.best_amount,
            total_kills: r.total_kills.unwrap_or(0),
        })
        .collect();

    let all_stars: Vec<AllStarEntry> = rankings
        .all_stars
        .into_iter()
        .map(|a| AllStarEntry {
            partition: a.partition,
            spec: a.spec,
            points: a.points,
            possible_points: a.possible_points,
            rank_percent: a.rank_percent,
        })
        .collect();

    CombatLogData {
        metric: metric.to_string(),
        has_logs,
        difficulty: rankings.difficulty,
        spec: all_stars
            .first()
            .and_then(|a| a.spec.clone())
            .filter(|s| !s.trim().is_empty()),
        best_average: rankings.best_performance_average,
        median_average: rankings.median_performance_average,
        rankings: bosses,
        all_stars,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rosterstat_core::ErrorKind;

    const URL: &str = "https://www.warcraftlogs.com/api/v2/client";

    fn response(zone_rankings: &Value) -> String {
        serde_json::json!({
            "data": {"characterData": {"character": {"name": "Alpha", "zoneRankings": zone_rankings}}}
        })
        .to_string()
    }

    fn rankings() -> Value {
        serde_json::json!({
            "bestPerformanceAverage": 91.2,
            "medianPerformanceAverage": 74.8,
            "metric": "dps",
            "rankings": [
                {"encounter": {"id": 3009, "name": "Vexie"}, "rankPercent": 95.1, "bestAmount": 1250000.5, "totalKills": 4},
                {"encounter": {"id": 3010, "name": "Cauldron"}, "rankPercent": null, "bestAmount": 0, "totalKills": 0}
            ],
            "allStars": [
                {"partition": 1, "spec": "Frost", "points": 120.5, "possiblePoints": 1200, "rankPercent": 88.0}
            ]
        })
    }

    #[test]
    fn test_parse_object_rankings() {
        let data = parse_character_rankings(&response(&rankings()), "dps", URL).unwrap();

        assert!(data.has_logs);
        assert_eq!(data.best_average, Some(91.2));
        assert_eq!(data.median_average, Some(74.8));
        assert_eq!(data.spec.as_deref(), Some("Frost"));
        assert_eq!(data.rankings.len(), 2);
        assert_eq!(data.rankings[0].encounter, "Vexie");
        assert_eq!(data.rankings[0].total_kills, 4);
        assert_eq!(data.rankings[1].rank_percent, None);
        assert_eq!(data.all_stars[0].possible_points, Some(1200.0));
    }

    #[test]
    fn test_parse_string_encoded_rankings() {
        let encoded = Value::String(rankings().to_string());
        let data = parse_character_rankings(&response(&encoded), "dps", URL).unwrap();
        assert_eq!(data.best_average, Some(91.2));
    }

    #[test]
    fn test_null_character_is_no_logs() {
        let json = r#"{"data": {"characterData": {"character": null}}}"#;
        let data = parse_character_rankings(json, "hps", URL).unwrap();

        assert!(!data.has_logs);
        assert_eq!(data.metric, "hps");
    }

    #[test]
    fn test_empty_rankings_is_no_logs() {
        let empty = serde_json::json!({"bestPerformanceAverage": null, "rankings": [], "allStars": []});
        let data = parse_character_rankings(&response(&empty), "dps", URL).unwrap();
        assert!(!data.has_logs);
    }

    #[test]
    fn test_errors_array_fails_despite_200() {
        let json = r#"{"data": null, "errors": [{"message": "Syntax error"}]}"#;
        let err = parse_character_rankings(json, "dps", URL).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_does_not_exist_is_not_found() {
        let json = r#"{"errors": [{"message": "This character does not exist."}]}"#;
        let err = parse_character_rankings(json, "dps", URL).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_empty_errors_array_is_ignored() {
        let json = r#"{"data": {"characterData": {"character": null}}, "errors": []}"#;
        assert!(parse_character_rankings(json, "dps", URL).is_ok());
    }
}
