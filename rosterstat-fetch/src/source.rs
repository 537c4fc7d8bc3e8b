//! Source fetcher trait.
//!
//! One implementation exists per upstream API. A fetcher builds the request
//! for a character, sends it through the context's [`RetryPolicy`], and
//! parses the body into a [`PartialRecord`]. It never panics on bad data;
//! every problem becomes a [`FetchError`].
//!
//! [`RetryPolicy`]: crate::retry::RetryPolicy

use async_trait::async_trait;
use rosterstat_core::{PartialRecord, RosterEntry, SourceKind};

use crate::context::FetchContext;
use crate::error::FetchError;

/// Fetches one source's fields for one character.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Returns a stable identifier for logs (e.g. `blizzard.profile`).
    fn id(&self) -> &str;

    /// Returns the source this fetcher populates.
    fn kind(&self) -> SourceKind;

    /// Fetches and parses the source payload for `entry`.
    async fn fetch(
        &self,
        entry: &RosterEntry,
        ctx: &FetchContext,
    ) -> Result<PartialRecord, FetchError>;
}
