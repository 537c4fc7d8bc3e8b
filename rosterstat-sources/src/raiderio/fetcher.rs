//! Raider.IO Mythic+ fetcher.

use async_trait::async_trait;
use rosterstat_core::{PartialRecord, RosterEntry, SourceKind, SourcePayload};
use rosterstat_fetch::{FetchContext, FetchError, SourceFetcher};
use tracing::{debug, instrument};

use super::api::RaiderIoApi;
use super::parser;

/// Fetches the Mythic+ score for one character.
#[derive(Debug, Clone)]
pub struct RaiderIoFetcher {
    api: RaiderIoApi,
}

impl RaiderIoFetcher {
    /// Creates a fetcher over the given API client.
    pub fn new(api: RaiderIoApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SourceFetcher for RaiderIoFetcher {
    fn id(&self) -> &str {
        "raiderio.mythic_plus"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::MythicPlus
    }

    #[instrument(skip_all, fields(character = %entry.label()))]
    async fn fetch(
        &self,
        entry: &RosterEntry,
        ctx: &FetchContext,
    ) -> Result<PartialRecord, FetchError> {
        let outcome = self.api.profile(entry, ctx).await?;
        let data = parser::parse_profile(&outcome.value, self.api.season())?;
        debug!(score = ?data.score, season = ?data.season, "Parsed Mythic+ profile");

        Ok(PartialRecord::new(
            SourcePayload::MythicPlus(data),
            outcome.attempts,
        ))
    }
}
