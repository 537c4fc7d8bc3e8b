//! Warcraft Logs GraphQL client.

use std::sync::Arc;

use rosterstat_core::RosterEntry;
use rosterstat_fetch::{FetchContext, FetchError, RetryOutcome, TokenCache};
use serde_json::json;
use tracing::{debug, instrument};

/// Zone rankings query for one character.
const CHARACTER_QUERY: &str = "query($name: String!, $server: String!, $region: String!, \
$metric: CharacterRankingMetricType!) { characterData { character(name: $name, \
serverSlug: $server, serverRegion: $region) { name zoneRankings(metric: $metric) } } }";

/// Bearer token source for the GraphQL API.
#[derive(Clone)]
pub enum WarcraftLogsToken {
    /// Client-credentials token, refreshed on expiry and on rejection.
    Cached(Arc<TokenCache>),
    /// Pre-issued token. A rejection is returned without retrying.
    Static(String),
}

impl std::fmt::Debug for WarcraftLogsToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cached(cache) => f.debug_tuple("Cached").field(cache).finish(),
            Self::Static(_) => f.write_str("Static(<redacted>)"),
        }
    }
}

/// Requests against the Warcraft Logs GraphQL API.
#[derive(Debug, Clone)]
pub struct WarcraftLogsApi {
    url: String,
    region: String,
    token: WarcraftLogsToken,
}

impl WarcraftLogsApi {
    /// Creates a client for the given GraphQL endpoint.
    pub fn new(url: impl Into<String>, region: impl Into<String>, token: WarcraftLogsToken) -> Self {
        Self {
            url: url.into(),
            region: region.into(),
            token,
        }
    }

    /// Returns the GraphQL endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetches zone rankings for `entry` ranked by `metric` (`dps` or `hps`).
    ///
    /// # Errors
    ///
    /// Returns the classified error once retries are exhausted.
    #[instrument(skip_all, fields(character = %entry.label(), metric = %metric))]
    pub async fn character_rankings(
        &self,
        entry: &RosterEntry,
        metric: &str,
        ctx: &FetchContext,
    ) -> Result<RetryOutcome<String>, FetchError> {
        let body = json!({
            "query": CHARACTER_QUERY,
            "variables": {
                "name": entry.name.trim(),
                "server": entry.server_slug.trim().to_lowercase(),
                "region": self.region,
                "metric": metric,
            },
        });
        debug!(url = %self.url, "Requesting zone rankings");

        let http = &ctx.http;
        let url = self.url.as_str();
        let body = &body;
        match &self.token {
            WarcraftLogsToken::Cached(cache) => {
                ctx.retry()
                    .execute(Some(&**cache), |bearer| async move {
                        http.post_json(url, body, bearer.as_deref()).await
                    })
                    .await
            }
            WarcraftLogsToken::Static(token) => {
                let token = token.as_str();
                ctx.retry()
                    .execute(None, |_| async move {
                        http.post_json(url, body, Some(token)).await
                    })
                    .await
            }
        }
    }
}
