//! Blizzard profile API client.

use std::sync::Arc;

use rosterstat_core::RosterEntry;
use rosterstat_fetch::host::http::build_url;
use rosterstat_fetch::{FetchContext, FetchError, RetryOutcome, TokenCache};
use tracing::{debug, instrument};

/// Path prefix of the character profile endpoints.
const PROFILE_PATH: [&str; 3] = ["profile", "wow", "character"];

// ============================================================================
// API Client
// ============================================================================

/// Requests against the Blizzard profile API.
#[derive(Debug, Clone)]
pub struct BlizzardApi {
    base: String,
    namespace: String,
    locale: String,
    tokens: Arc<TokenCache>,
}

impl BlizzardApi {
    /// Creates a client for the given API base.
    pub fn new(
        base: impl Into<String>,
        namespace: impl Into<String>,
        locale: impl Into<String>,
        tokens: Arc<TokenCache>,
    ) -> Self {
        Self {
            base: base.into(),
            namespace: namespace.into(),
            locale: locale.into(),
            tokens,
        }
    }

    /// Returns the response locale.
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Returns the token cache.
    pub fn tokens(&self) -> &Arc<TokenCache> {
        &self.tokens
    }

    /// Fetches the character summary.
    ///
    /// # Errors
    ///
    /// Returns the classified error once retries are exhausted.
    #[instrument(skip_all, fields(character = %entry.label()))]
    pub async fn summary(
        &self,
        entry: &RosterEntry,
        ctx: &FetchContext,
    ) -> Result<RetryOutcome<String>, FetchError> {
        self.get_profile(entry, None, ctx).await
    }

    /// Fetches the character's equipped items.
    ///
    /// # Errors
    ///
    /// Returns the classified error once retries are exhausted.
    #[instrument(skip_all, fields(character = %entry.label()))]
    pub async fn equipment(
        &self,
        entry: &RosterEntry,
        ctx: &FetchContext,
    ) -> Result<RetryOutcome<String>, FetchError> {
        self.get_profile(entry, Some("equipment"), ctx).await
    }

    async fn get_profile(
        &self,
        entry: &RosterEntry,
        suffix: Option<&str>,
        ctx: &FetchContext,
    ) -> Result<RetryOutcome<String>, FetchError> {
        let realm = realm_slug(&entry.server_slug);
        let name = character_slug(&entry.name);

        let mut segments: Vec<&str> = PROFILE_PATH.to_vec();
        segments.push(&realm);
        segments.push(&name);
        segments.extend(suffix);

        let url = build_url(&self.base, &segments)?.to_string();
        let query = [
            ("namespace", self.namespace.as_str()),
            ("locale", self.locale.as_str()),
        ];
        debug!(url = %url, "Requesting profile");

        let http = &ctx.http;
        let url = url.as_str();
        let query = &query[..];
        ctx.retry()
            .execute(Some(&*self.tokens), |bearer| async move {
                http.get(url, query, bearer.as_deref()).await
            })
            .await
    }
}

// ============================================================================
// Path Normalization
// ============================================================================

/// Lower-cases the realm slug.
pub fn realm_slug(realm: &str) -> String {
    realm.trim().to_lowercase()
}

/// Lower-cases ASCII names; names with non-ASCII characters are kept as-is.
pub fn character_slug(name: &str) -> String {
    let name = name.trim();
    if name.is_ascii() {
        name.to_ascii_lowercase()
    } else {
        name.to_string()
    }
}
