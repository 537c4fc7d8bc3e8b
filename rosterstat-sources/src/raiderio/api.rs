//! Raider.IO API client.

use rosterstat_core::RosterEntry;
use rosterstat_fetch::{FetchContext, FetchError, RetryOutcome};
use tracing::{debug, instrument};

/// Character profile endpoint, relative to the base URL.
const PROFILE_ENDPOINT: &str = "/api/v1/characters/profile";

/// Season selector used when no season is configured.
const CURRENT_SEASON: &str = "current";

/// Body fragment Raider.IO sends with a 400 for unknown characters.
const UNKNOWN_CHARACTER: &str = "could not find requested character";

/// Requests against the Raider.IO API.
#[derive(Debug, Clone)]
pub struct RaiderIoApi {
    base: String,
    region: String,
    season: Option<String>,
}

impl RaiderIoApi {
    /// Creates a client.
    pub fn new(base: impl Into<String>, region: impl Into<String>, season: Option<String>) -> Self {
        Self {
            base: base.into(),
            region: region.into(),
            season,
        }
    }

    /// Returns the configured season id.
    pub fn season(&self) -> Option<&str> {
        self.season.as_deref()
    }

    /// Fetches the character's Mythic+ scores.
    ///
    /// An unknown character is reported as [`FetchError::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns the classified error once retries are exhausted.
    #[instrument(skip_all, fields(character = %entry.label()))]
    pub async fn profile(
        &self,
        entry: &RosterEntry,
        ctx: &FetchContext,
    ) -> Result<RetryOutcome<String>, FetchError> {
        let url = format!("{}{PROFILE_ENDPOINT}", self.base.trim_end_matches('/'));
        let fields = format!(
            "mythic_plus_scores_by_season:{}",
            self.season.as_deref().unwrap_or(CURRENT_SEASON)
        );
        let realm = entry.server_slug.trim().to_lowercase();
        let query = [
            ("region", self.region.as_str()),
            ("realm", realm.as_str()),
            ("name", entry.name.trim()),
            ("fields", fields.as_str()),
        ];
        debug!(url = %url, "Requesting Mythic+ profile");

        let http = &ctx.http;
        let url = url.as_str();
        let query = &query[..];
        ctx.retry()
            .execute(None, |_| async move {
                http.get(url, query, None).await.map_err(|e| unknown_character(e, url))
            })
            .await
    }
}

/// Maps Raider.IO's 400 for unknown characters to `NotFound`.
fn unknown_character(error: FetchError, url: &str) -> FetchError {
    match error {
        FetchError::HttpStatus { status: 400, ref body }
            if body.to_lowercase().contains(UNKNOWN_CHARACTER) =>
        {
            FetchError::NotFound {
                url: url.to_string(),
            }
        }
        other => other,
    }
}
