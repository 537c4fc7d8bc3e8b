//! Source registry.
//!
//! Builds the fetchers for one run from settings and credentials. Each
//! OAuth-protected API gets exactly one [`TokenCache`], shared by every
//! worker through the fetcher that owns it.

use std::sync::Arc;

use rosterstat_core::SourceKind;
use rosterstat_fetch::{ClientCredentials, HttpClient, SourceFetcher, TokenCache};
use tracing::{info, warn};

use crate::blizzard::{BlizzardApi, BlizzardProfileFetcher};
use crate::error::SourceError;
use crate::raiderio::{RaiderIoApi, RaiderIoFetcher};
use crate::settings::{SourceCredentials, SourceSettings, WarcraftLogsAuth};
use crate::warcraftlogs::{WarcraftLogsApi, WarcraftLogsFetcher, WarcraftLogsToken};

// ============================================================================
// Source Set
// ============================================================================

/// The fetchers for one run and the token caches behind them.
#[derive(Clone)]
pub struct SourceSet {
    fetchers: Vec<Arc<dyn SourceFetcher>>,
    blizzard_tokens: Arc<TokenCache>,
    warcraftlogs_tokens: Option<Arc<TokenCache>>,
}

impl SourceSet {
    /// Returns the fetchers in registration order.
    pub fn fetchers(&self) -> &[Arc<dyn SourceFetcher>] {
        &self.fetchers
    }

    /// Consumes the set, returning the fetchers.
    pub fn into_fetchers(self) -> Vec<Arc<dyn SourceFetcher>> {
        self.fetchers
    }

    /// Returns the registered source kinds.
    pub fn kinds(&self) -> Vec<SourceKind> {
        self.fetchers.iter().map(|f| f.kind()).collect()
    }

    /// Returns the Blizzard token cache.
    pub fn blizzard_tokens(&self) -> &Arc<TokenCache> {
        &self.blizzard_tokens
    }

    /// Returns the Warcraft Logs token cache, if client credentials are used.
    pub fn warcraftlogs_tokens(&self) -> Option<&Arc<TokenCache>> {
        self.warcraftlogs_tokens.as_ref()
    }
}

impl std::fmt::Debug for SourceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSet")
            .field(
                "fetchers",
                &self.fetchers.iter().map(|s| s.id()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Source Registry
// ============================================================================

/// Builds source fetchers.
pub struct SourceRegistry;

impl SourceRegistry {
    /// Builds every source the credentials allow.
    ///
    /// The combat-log source is skipped when no Warcraft Logs auth is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the region or locale is empty, or if Blizzard
    /// credentials are blank.
    pub fn build(
        settings: &SourceSettings,
        credentials: &SourceCredentials,
        http: Arc<HttpClient>,
    ) -> Result<SourceSet, SourceError> {
        let region = settings.region();
        if region.is_empty() || !region.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(SourceError::InvalidSettings(format!(
                "region must be a short code like 'kr', got '{}'",
                settings.region
            )));
        }
        if settings.locale.trim().is_empty() {
            return Err(SourceError::InvalidSettings("locale is empty".to_string()));
        }
        if is_blank(&credentials.blizzard) {
            return Err(SourceError::MissingCredentials("Blizzard"));
        }

        let endpoints = &settings.endpoints;

        let blizzard_tokens = Arc::new(TokenCache::new(
            SourceKind::Profile.service_name(),
            Arc::clone(&http),
            endpoints.blizzard_oauth_url(&region),
            credentials.blizzard.clone(),
        ));
        let blizzard = BlizzardProfileFetcher::new(BlizzardApi::new(
            endpoints.blizzard_api_base(&region),
            settings.profile_namespace(),
            settings.locale.trim(),
            Arc::clone(&blizzard_tokens),
        ));

        let raiderio = RaiderIoFetcher::new(RaiderIoApi::new(
            endpoints.raiderio_base(),
            region.clone(),
            settings.season.clone(),
        ));

        let mut fetchers: Vec<Arc<dyn SourceFetcher>> =
            vec![Arc::new(blizzard), Arc::new(raiderio)];
        let mut warcraftlogs_tokens = None;

        let wcl_token = match &credentials.warcraftlogs {
            Some(WarcraftLogsAuth::ClientCredentials(creds)) if !is_blank(creds) => {
                let cache = Arc::new(TokenCache::new(
                    SourceKind::CombatLog.service_name(),
                    Arc::clone(&http),
                    endpoints.warcraftlogs_oauth_url(),
                    creds.clone(),
                ));
                warcraftlogs_tokens = Some(Arc::clone(&cache));
                Some(WarcraftLogsToken::Cached(cache))
            }
            Some(WarcraftLogsAuth::StaticToken(token)) if !token.trim().is_empty() => {
                Some(WarcraftLogsToken::Static(token.trim().to_string()))
            }
            _ => None,
        };

        match wcl_token {
            Some(token) => {
                let api = WarcraftLogsApi::new(endpoints.warcraftlogs_api_url(), region, token);
                fetchers.push(Arc::new(WarcraftLogsFetcher::new(api)));
            }
            None => warn!("No Warcraft Logs credentials, combat-log source disabled"),
        }

        let set = SourceSet {
            fetchers,
            blizzard_tokens,
            warcraftlogs_tokens,
        };
        info!(sources = ?set.kinds(), "Sources registered");
        Ok(set)
    }
}

fn is_blank(credentials: &ClientCredentials) -> bool {
    credentials.client_id.trim().is_empty() || credentials.client_secret.trim().is_empty()
}

// ============================================================================
// Tests
// ============================================================================
