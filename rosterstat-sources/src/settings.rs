//! Source settings and credentials.

use rosterstat_fetch::ClientCredentials;
use serde::{Deserialize, Serialize};

/// Default API region.
pub const DEFAULT_REGION: &str = "kr";

/// Default response locale.
pub const DEFAULT_LOCALE: &str = "ko_KR";

const RAIDERIO_BASE: &str = "https://raider.io";
const WARCRAFTLOGS_BASE: &str = "https://www.warcraftlogs.com";

// ============================================================================
// Source Settings
// ============================================================================

/// Region, locale and endpoints shared by every source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// API region (`kr`, `eu`, `us`, `tw`).
    pub region: String,
    /// Response locale for localized names.
    pub locale: String,
    /// Mythic+ season id (e.g. `season-tww-3`). `None` uses the current season.
    pub season: Option<String>,
    /// Base URL overrides.
    pub endpoints: Endpoints,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            season: None,
            endpoints: Endpoints::default(),
        }
    }
}

impl SourceSettings {
    /// Returns the lower-cased region.
    pub fn region(&self) -> String {
        self.region.trim().to_ascii_lowercase()
    }

    /// Returns the Blizzard profile namespace (`profile-kr`).
    pub fn profile_namespace(&self) -> String {
        format!("profile-{}", self.region())
    }
}

// ============================================================================
// Endpoints
// ============================================================================

/// Optional base URL overrides. Unset entries use the public endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Blizzard OAuth token URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blizzard_oauth: Option<String>,
    /// Blizzard API base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blizzard_api: Option<String>,
    /// Raider.IO base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raiderio: Option<String>,
    /// Warcraft Logs base URL (token and GraphQL endpoints live under it).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warcraftlogs: Option<String>,
}

impl Endpoints {
    /// Blizzard token URL for `region`.
    pub fn blizzard_oauth_url(&self, region: &str) -> String {
        self.blizzard_oauth
            .clone()
            .unwrap_or_else(|| format!("https://{region}.battle.net/oauth/token"))
    }

    /// Blizzard API base for `region`.
    pub fn blizzard_api_base(&self, region: &str) -> String {
        self.blizzard_api
            .clone()
            .unwrap_or_else(|| format!("https://{region}.api.blizzard.com"))
    }

    /// Raider.IO base URL.
    pub fn raiderio_base(&self) -> String {
        self.raiderio
            .clone()
            .unwrap_or_else(|| RAIDERIO_BASE.to_string())
    }

    /// Warcraft Logs token URL.
    pub fn warcraftlogs_oauth_url(&self) -> String {
        format!("{}/oauth/token", self.warcraftlogs_base())
    }

    /// Warcraft Logs GraphQL URL.
    pub fn warcraftlogs_api_url(&self) -> String {
        format!("{}/api/v2/client", self.warcraftlogs_base())
    }

    fn warcraftlogs_base(&self) -> String {
        self.warcraftlogs
            .as_deref()
            .unwrap_or(WARCRAFTLOGS_BASE)
            .trim_end_matches('/')
            .to_string()
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// How the Warcraft Logs client authenticates.
#[derive(Clone, PartialEq, Eq)]
pub enum WarcraftLogsAuth {
    /// OAuth client credentials, refreshed through a token cache.
    ClientCredentials(ClientCredentials),
    /// A pre-issued bearer token.
    StaticToken(String),
}

impl std::fmt::Debug for WarcraftLogsAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClientCredentials(c) => f.debug_tuple("ClientCredentials").field(c).finish(),
            Self::StaticToken(_) => f.write_str("StaticToken(<redacted>)"),
        }
    }
}

/// Credentials for the OAuth-protected sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCredentials {
    /// Blizzard client credentials.
    pub blizzard: ClientCredentials,
    /// Warcraft Logs auth. `None` disables the combat-log source.
    pub warcraftlogs: Option<WarcraftLogsAuth>,
}
