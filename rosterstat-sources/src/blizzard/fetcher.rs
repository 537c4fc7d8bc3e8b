//! Blizzard profile fetcher.

use async_trait::async_trait;
use rosterstat_core::{
    EquippedItem, ErrorKind, PartialRecord, ProfileData, RosterEntry, SourceKind, SourcePayload,
};
use rosterstat_fetch::{FetchContext, FetchError, SourceFetcher};
use tracing::{debug, instrument, warn};

use super::api::BlizzardApi;
use super::parser;

/// Fetches spec, item level and equipment for one character.
#[derive(Debug, Clone)]
pub struct BlizzardProfileFetcher {
    api: BlizzardApi,
}

impl BlizzardProfileFetcher {
    /// Creates a fetcher over the given API client.
    pub fn new(api: BlizzardApi) -> Self {
        Self { api }
    }

    /// Fetches the equipment list. A character without an equipment
    /// endpoint yields an empty list.
    async fn equipment(
        &self,
        entry: &RosterEntry,
        ctx: &FetchContext,
    ) -> Result<(Option<Vec<EquippedItem>>, u32), FetchError> {
        match self.api.equipment(entry, ctx).await {
            Ok(outcome) => {
                let items = parser::parse_equipment(&outcome.value, self.api.locale())?;
                Ok((Some(items), outcome.attempts))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No equipment endpoint for character");
                Ok((Some(Vec::new()), 1))
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl SourceFetcher for BlizzardProfileFetcher {
    fn id(&self) -> &str {
        "blizzard.profile"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Profile
    }

    #[instrument(skip_all, fields(character = %entry.label()))]
    async fn fetch(
        &self,
        entry: &RosterEntry,
        ctx: &FetchContext,
    ) -> Result<PartialRecord, FetchError> {
        let summary = self.api.summary(entry, ctx).await?;
        let profile = parser::parse_summary(&summary.value, self.api.locale())?;

        let (equipment, equipment_attempts) = match self.equipment(entry, ctx).await {
            Ok(outcome) => outcome,
            Err(e) if e.kind().is_run_fatal() || e.kind() == ErrorKind::Cancelled => {
                return Err(e);
            }
            Err(e) => {
                // The summary already carries spec and item level.
                warn!(error = %e, kind = %e.kind(), "Equipment unavailable, keeping summary");
                (None, e.attempts().unwrap_or(1))
            }
        };

        let item_level =
            parser::resolve_item_level(&profile, equipment.as_deref().unwrap_or(&[]));
        debug!(
            item_level = ?item_level,
            items = ?equipment.as_ref().map(Vec::len),
            "Parsed profile"
        );

        Ok(PartialRecord::new(
            SourcePayload::Profile(ProfileData {
                spec: profile.spec,
                item_level,
                equipment,
            }),
            summary.attempts + equipment_attempts,
        ))
    }
}
