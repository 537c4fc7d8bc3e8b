//! OAuth client-credentials token cache.
//!
//! One [`TokenCache`] exists per OAuth-protected API and is shared by every
//! worker through an `Arc`. A fresh token is served under a shared read lock;
//! refreshes are serialized by a dedicated lock so that any number of
//! concurrent callers observing an expired token cause exactly one request to
//! the token endpoint.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{Duration, Utc};
use rosterstat_core::Token;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::error::FetchError;
use crate::host::http::HttpClient;

// ============================================================================
// Constants
// ============================================================================

/// Refresh this long before the upstream expiry.
const DEFAULT_SAFETY_MARGIN_MINS: i64 = 5;

/// The margin never exceeds `1 / MARGIN_TTL_DIVISOR` of a token's lifetime,
/// so short-lived tokens are still reused.
const MARGIN_TTL_DIVISOR: i32 = 2;

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TTL_MINS: i64 = 50;

/// Upper bound on a reported token lifetime.
const MAX_TTL_SECS: i64 = 7 * 24 * 60 * 60;

// ============================================================================
// Credentials
// ============================================================================

/// OAuth client credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    /// Client ID.
    pub client_id: String,
    /// Client secret.
    pub client_secret: String,
}

impl ClientCredentials {
    /// Creates a new credential pair.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

// ============================================================================
// Token Cache
// ============================================================================

/// A cached token and the margin it was issued with.
#[derive(Debug, Clone)]
struct CachedToken {
    token: Token,
    margin: Duration,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.token.is_fresh(self.margin)
    }
}

/// Lazily refreshed bearer token for one OAuth-protected API.
pub struct TokenCache {
    label: String,
    http: Arc<HttpClient>,
    token_url: String,
    credentials: ClientCredentials,
    safety_margin: Duration,
    token: RwLock<Option<CachedToken>>,
    refresh_lock: Mutex<()>,
    refreshes: AtomicU32,
}

impl TokenCache {
    /// Creates an empty cache for the given token endpoint.
    pub fn new(
        label: impl Into<String>,
        http: Arc<HttpClient>,
        token_url: impl Into<String>,
        credentials: ClientCredentials,
    ) -> Self {
        Self {
            label: label.into(),
            http,
            token_url: token_url.into(),
            credentials,
            safety_margin: Duration::minutes(DEFAULT_SAFETY_MARGIN_MINS),
            token: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            refreshes: AtomicU32::new(0),
        }
    }

    /// Sets how long before expiry a token is considered stale.
    ///
    /// The margin is capped at half of each token's lifetime.
    #[must_use]
    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Returns the label used in logs.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the number of token endpoint requests made so far.
    pub fn refresh_count(&self) -> u32 {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Returns a copy of the cached token, fresh or not.
    pub async fn current(&self) -> Option<Token> {
        self.token.read().await.as_ref().map(|c| c.token.clone())
    }

    /// Returns the freshness margin for a token that lives `ttl`.
    fn margin_for(&self, ttl: Duration) -> Duration {
        self.safety_margin.min(ttl / MARGIN_TTL_DIVISOR)
    }

    /// Returns a fresh bearer token, refreshing it if needed.
    ///
    /// Concurrent callers that find the token stale wait on a single refresh.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::AuthProviderDown`] if the token endpoint cannot
    /// issue a token. The previously cached token is left in place.
    pub async fn get_token(&self) -> Result<String, FetchError> {
        if let Some(value) = self.fresh_value().await {
            return Ok(value);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(value) = self.fresh_value().await {
            debug!(api = %self.label, "Token refreshed by another caller");
            return Ok(value);
        }

        self.refresh().await
    }

    /// Replaces a token the upstream rejected.
    ///
    /// Refreshes only if `stale` is still the cached token; if another caller
    /// already replaced it, the newer token is returned without a request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::AuthProviderDown`] if the token endpoint cannot
    /// issue a token.
    pub async fn refresh_after_rejection(&self, stale: &str) -> Result<String, FetchError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(cached) = self.token.read().await.as_ref() {
            if cached.token.value != stale && cached.is_fresh() {
                debug!(api = %self.label, "Rejected token already replaced");
                return Ok(cached.token.value.clone());
            }
        }

        self.refresh().await
    }

    async fn fresh_value(&self) -> Option<String> {
        self.token
            .read()
            .await
            .as_ref()
            .filter(|c| c.is_fresh())
            .map(|c| c.token.value.clone())
    }

    /// Requests a new token. Callers must hold `refresh_lock`.
    #[instrument(skip(self), fields(api = %self.label))]
    async fn refresh(&self) -> Result<String, FetchError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        debug!("Requesting access token");

        let body = self
            .http
            .post_form_basic(
                &self.token_url,
                &[("grant_type", "client_credentials")],
                &self.credentials.client_id,
                &self.credentials.client_secret,
            )
            .await
            .map_err(|e| {
                warn!(error = %e, "Token endpoint request failed");
                FetchError::AuthProviderDown(format!("{} token endpoint: {e}", self.label))
            })?;

        let response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            FetchError::AuthProviderDown(format!("{} token response: {e}", self.label))
        })?;

        let value = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                FetchError::AuthProviderDown(format!(
                    "{} token response has no access_token",
                    self.label
                ))
            })?;

        let ttl = response
            .expires_in
            .map_or(Duration::minutes(DEFAULT_TTL_MINS), |secs| {
                Duration::seconds(secs.clamp(0, MAX_TTL_SECS))
            });
        let token = Token::issued(value.clone(), Utc::now(), ttl);
        let margin = self.margin_for(ttl);
        info!(
            expires_at = %token.expires_at,
            margin_secs = margin.num_seconds(),
            "Access token refreshed"
        );

        *self.token.write().await = Some(CachedToken { token, margin });
        Ok(value)
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("label", &self.label)
            .field("token_url", &self.token_url)
            .field("refreshes", &self.refresh_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token_body(value: &str, expires_in: i64) -> serde_json::Value {
        serde_json::json!({
            "access_token": value,
            "token_type": "bearer",
            "expires_in": expires_in,
        })
    }

    fn cache(server: &MockServer) -> TokenCache {
        TokenCache::new(
            "test",
            Arc::new(HttpClient::new().unwrap()),
            format!("{}/oauth/token", server.uri()),
            ClientCredentials::new("id", "secret"),
        )
    }

    #[tokio::test]
    async fn test_cached_token_needs_no_io() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(header_exists("authorization"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("t1", 86399)))
            .expect(1)
            .mount(&server)
            .await;

        let cache = cache(&server);
        assert_eq!(cache.get_token().await.unwrap(), "t1");
        assert_eq!(cache.get_token().await.unwrap(), "t1");
        assert_eq!(cache.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(token_body("shared", 3600))
                    .set_delay(std::time::Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cache = Arc::new(cache(&server));
        let callers: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get_token().await })
            })
            .collect();

        for caller in futures::future::join_all(callers).await {
            assert_eq!(caller.unwrap().unwrap(), "shared");
        }
        assert_eq!(cache.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("short", 0)))
            .expect(2)
            .mount(&server)
            .await;

        let cache = cache(&server);
        cache.get_token().await.unwrap();
        cache.get_token().await.unwrap();
        assert_eq!(cache.refresh_count(), 2);
    }

    #[tokio::test]
    async fn test_short_lived_token_is_reused() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("short", 60)))
            .expect(1)
            .mount(&server)
            .await;

        // 60s is below the 5 minute margin, which shrinks to 30s.
        let cache = cache(&server);
        assert_eq!(cache.get_token().await.unwrap(), "short");
        assert_eq!(cache.get_token().await.unwrap(), "short");
        assert_eq!(cache.refresh_count(), 1);
    }

    #[test]
    fn test_margin_is_capped_by_ttl() {
        let cache = TokenCache::new(
            "test",
            Arc::new(HttpClient::new().unwrap()),
            "http://localhost/oauth/token",
            ClientCredentials::new("id", "secret"),
        );

        assert_eq!(cache.margin_for(Duration::hours(24)), Duration::minutes(5));
        assert_eq!(cache.margin_for(Duration::seconds(60)), Duration::seconds(30));
        assert_eq!(cache.margin_for(Duration::zero()), Duration::zero());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("old", 0)))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let cache = cache(&server);
        assert_eq!(cache.get_token().await.unwrap(), "old");

        let err = cache.get_token().await.unwrap_err();
        assert!(matches!(err, FetchError::AuthProviderDown(_)));
        assert_eq!(cache.current().await.unwrap().value, "old");
    }

    #[tokio::test]
    async fn test_missing_access_token_is_provider_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "invalid_client"
            })))
            .mount(&server)
            .await;

        let err = cache(&server).get_token().await.unwrap_err();
        assert_eq!(err.kind(), rosterstat_core::ErrorKind::AuthProviderDown);
    }

    #[tokio::test]
    async fn test_missing_expires_in_uses_default_ttl() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "no-expiry"
            })))
            .mount(&server)
            .await;

        let cache = cache(&server);
        cache.get_token().await.unwrap();
        let token = cache.current().await.unwrap();
        assert!(token.expires_at > Utc::now() + Duration::minutes(45));
    }

    #[tokio::test]
    async fn test_rejection_after_replacement_skips_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("fresh", 3600)))
            .expect(1)
            .mount(&server)
            .await;

        let cache = cache(&server);
        cache.get_token().await.unwrap();

        // A token nobody holds any more does not trigger another refresh.
        let value = cache.refresh_after_rejection("older").await.unwrap();
        assert_eq!(value, "fresh");
        assert_eq!(cache.refresh_count(), 1);
    }
}
