//! Warcraft Logs combat-log fetcher.

use async_trait::async_trait;
use rosterstat_core::{PartialRecord, RosterEntry, SourceKind, SourcePayload};
use rosterstat_fetch::{FetchContext, FetchError, SourceFetcher};
use tracing::{debug, instrument};

use super::api::WarcraftLogsApi;
use super::parser;

/// Fetches raid rankings for one character.
///
/// Healers are ranked by healing done, everyone else by damage done.
#[derive(Debug, Clone)]
pub struct WarcraftLogsFetcher {
    api: WarcraftLogsApi,
}

impl WarcraftLogsFetcher {
    /// Creates a fetcher over the given API client.
    pub fn new(api: WarcraftLogsApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SourceFetcher for WarcraftLogsFetcher {
    fn id(&self) -> &str {
        "warcraftlogs.rankings"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::CombatLog
    }

    #[instrument(skip_all, fields(character = %entry.label()))]
    async fn fetch(
        &self,
        entry: &RosterEntry,
        ctx: &FetchContext,
    ) -> Result<PartialRecord, FetchError> {
        let metric = entry.role.metric();
        let outcome = self.api.character_rankings(entry, metric, ctx).await?;
        let data = parser::parse_character_rankings(&outcome.value, metric, self.api.url())?;
        debug!(
            has_logs = data.has_logs,
            best = ?data.best_average,
            bosses = data.rankings.len(),
            "Parsed zone rankings"
        );

        Ok(PartialRecord::new(
            SourcePayload::CombatLog(data),
            outcome.attempts,
        ))
    }
}
