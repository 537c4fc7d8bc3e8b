//! API credentials from the environment.

use rosterstat_fetch::ClientCredentials;
use rosterstat_sources::{SourceCredentials, WarcraftLogsAuth};
use tracing::{debug, warn};

use crate::config::ConfigError;

/// Blizzard OAuth client id.
pub const BLIZZARD_CLIENT_ID: &str = "BLIZZARD_CLIENT_ID";
/// Blizzard OAuth client secret.
pub const BLIZZARD_CLIENT_SECRET: &str = "BLIZZARD_CLIENT_SECRET";
/// Warcraft Logs OAuth client id.
pub const WCL_CLIENT_ID: &str = "WCL_CLIENT_ID";
/// Warcraft Logs OAuth client secret.
pub const WCL_CLIENT_SECRET: &str = "WCL_CLIENT_SECRET";
/// Pre-issued Warcraft Logs bearer token.
pub const WCL_ACCESS_TOKEN: &str = "WCL_ACCESS_TOKEN";

/// Reads credentials from the process environment.
///
/// # Errors
///
/// Returns [`ConfigError::MissingCredential`] if a Blizzard variable is
/// unset or blank.
pub fn from_env() -> Result<SourceCredentials, ConfigError> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Reads credentials through `lookup`, treating blank values as unset.
///
/// Warcraft Logs client credentials take precedence over a static token.
/// Without either, the combat-log source is disabled.
///
/// # Errors
///
/// Returns [`ConfigError::MissingCredential`] if a Blizzard variable is
/// unset or blank.
pub fn from_lookup<F>(lookup: F) -> Result<SourceCredentials, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| {
        lookup(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let client_id =
        get(BLIZZARD_CLIENT_ID).ok_or(ConfigError::MissingCredential(BLIZZARD_CLIENT_ID))?;
    let client_secret = get(BLIZZARD_CLIENT_SECRET)
        .ok_or(ConfigError::MissingCredential(BLIZZARD_CLIENT_SECRET))?;

    let warcraftlogs = match (get(WCL_CLIENT_ID), get(WCL_CLIENT_SECRET), get(WCL_ACCESS_TOKEN)) {
        (Some(id), Some(secret), _) => {
            debug!("Using Warcraft Logs client credentials");
            Some(WarcraftLogsAuth::ClientCredentials(ClientCredentials::new(
                id, secret,
            )))
        }
        (id, secret, Some(token)) => {
            if id.is_some() != secret.is_some() {
                warn!("Incomplete Warcraft Logs client credentials, using access token");
            }
            Some(WarcraftLogsAuth::StaticToken(token))
        }
        (id, secret, None) => {
            if id.is_some() || secret.is_some() {
                warn!(
                    "Set both {} and {} to enable Warcraft Logs",
                    WCL_CLIENT_ID, WCL_CLIENT_SECRET
                );
            }
            None
        }
    };

    Ok(SourceCredentials {
        blizzard: ClientCredentials::new(client_id, client_secret),
        warcraftlogs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BLIZZARD: [(&str, &str); 2] = [
        (BLIZZARD_CLIENT_ID, "bz-id"),
        (BLIZZARD_CLIENT_SECRET, "bz-secret"),
    ];

    #[test]
    fn test_blizzard_only() {
        let creds = from_lookup(lookup(&BLIZZARD)).unwrap();
        assert_eq!(creds.blizzard.client_id, "bz-id");
        assert!(creds.warcraftlogs.is_none());
    }

    #[test]
    fn test_missing_blizzard_secret() {
        let err = from_lookup(lookup(&[(BLIZZARD_CLIENT_ID, "bz-id")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingCredential(BLIZZARD_CLIENT_SECRET)
        ));
    }

    #[test]
    fn test_blank_is_missing() {
        let err = from_lookup(lookup(&[
            (BLIZZARD_CLIENT_ID, "  "),
            (BLIZZARD_CLIENT_SECRET, "bz-secret"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential(BLIZZARD_CLIENT_ID)));
    }

    #[test]
    fn test_client_credentials_win_over_token() {
        let mut vars = BLIZZARD.to_vec();
        vars.extend([
            (WCL_CLIENT_ID, "wcl-id"),
            (WCL_CLIENT_SECRET, "wcl-secret"),
            (WCL_ACCESS_TOKEN, "wcl-token"),
        ]);

        let creds = from_lookup(lookup(&vars)).unwrap();
        assert!(matches!(
            creds.warcraftlogs,
            Some(WarcraftLogsAuth::ClientCredentials(_))
        ));
    }

    #[test]
    fn test_static_token() {
        let mut vars = BLIZZARD.to_vec();
        vars.extend([(WCL_CLIENT_ID, "wcl-id"), (WCL_ACCESS_TOKEN, "wcl-token")]);

        let creds = from_lookup(lookup(&vars)).unwrap();
        assert_eq!(
            creds.warcraftlogs,
            Some(WarcraftLogsAuth::StaticToken("wcl-token".to_string()))
        );
    }
}
