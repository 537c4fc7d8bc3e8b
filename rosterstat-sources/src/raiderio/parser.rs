//! Raider.IO response parser.

use rosterstat_core::MythicPlusData;
use rosterstat_fetch::FetchError;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    mythic_plus_scores_by_season: Option<Vec<SeasonScores>>,
}

#[derive(Debug, Deserialize)]
struct SeasonScores {
    #[serde(default)]
    season: Option<String>,
    #[serde(default)]
    scores: Option<Scores>,
    #[serde(default)]
    segments: Option<Segments>,
}

#[derive(Debug, Deserialize)]
struct Scores {
    #[serde(default)]
    all: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Segments {
    #[serde(default)]
    all: Option<Segment>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    #[serde(default)]
    score: Option<f64>,
}

impl SeasonScores {
    fn score(&self) -> Option<f64> {
        self.scores
            .as_ref()
            .and_then(|s| s.all)
            .or_else(|| self.segments.as_ref().and_then(|s| s.all.as_ref()).and_then(|s| s.score))
    }
}

/// Parses a character profile into Mythic+ data.
///
/// The season matching `season` is used when present, otherwise the first
/// entry. A profile without seasons yields a payload with no score.
pub fn parse_profile(json: &str, season: Option<&str>) -> Result<MythicPlusData, FetchError> {
    debug!(len = json.len(), "Parsing Raider.IO profile");

    let response: ProfileResponse = serde_json::from_str(json)
        .map_err(|e| FetchError::InvalidResponse(format!("raider.io profile: {e}")))?;

    let seasons = response.mythic_plus_scores_by_season.unwrap_or_default();
    let chosen = season
        .and_then(|id| seasons.iter().find(|s| s.season.as_deref() == Some(id)))
        .or_else(|| seasons.first());

    Ok(match chosen {
        Some(entry) => MythicPlusData {
            score: entry.score(),
            season: entry.season.clone(),
        },
        None => MythicPlusData::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"{
        "name": "Alpha",
        "realm": "Azshara",
        "mythic_plus_scores_by_season": [
            {"season": "season-tww-3", "scores": {"all": 2875.5, "dps": 2875.5}},
            {"season": "season-tww-2", "scores": {"all": 3100.1}}
        ]
    }"#;

    #[test]
    fn test_configured_season_wins() {
        let data = parse_profile(PROFILE, Some("season-tww-2")).unwrap();
        assert_eq!(data.score, Some(3100.1));
        assert_eq!(data.season.as_deref(), Some("season-tww-2"));
    }

    #[test]
    fn test_falls_back_to_first_season() {
        let data = parse_profile(PROFILE, Some("season-df-4")).unwrap();
        assert_eq!(data.score, Some(2875.5));

        let data = parse_profile(PROFILE, None).unwrap();
        assert_eq!(data.season.as_deref(), Some("season-tww-3"));
    }

    #[test]
    fn test_segments_shape() {
        let json = r#"{"mythic_plus_scores_by_season": [
            {"season": "season-tww-3", "segments": {"all": {"score": 1999.0, "color": "e6cc80"}}}
        ]}"#;
        assert_eq!(parse_profile(json, None).unwrap().score, Some(1999.0));
    }

    #[test]
    fn test_no_seasons_is_no_data() {
        let data = parse_profile(r#"{"name": "Alpha"}"#, None).unwrap();
        assert_eq!(data, MythicPlusData::default());
    }
}
