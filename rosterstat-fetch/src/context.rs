//! Fetch context shared by every source fetcher.
//!
//! The context carries the shared HTTP client and the run settings. It is
//! created once and handed by reference to every fetch.

use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;
use crate::host::http::HttpClient;
use crate::retry::RetryPolicy;

// ============================================================================
// Fetch Settings
// ============================================================================

/// Settings for a roster run.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Per-request retry policy.
    pub retry: RetryPolicy,
    /// Number of characters fetched in parallel.
    pub concurrency: usize,
    /// Extra whole-character passes when item level and logs are both missing.
    pub max_extra_passes: u32,
    /// Delay between whole-character passes.
    pub character_retry_delay: Duration,
    /// Overall run timeout.
    pub run_timeout: Option<Duration>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
            concurrency: 3,
            max_extra_passes: 2,
            character_retry_delay: Duration::from_secs(2),
            run_timeout: None,
        }
    }
}

impl FetchSettings {
    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the worker count.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the whole-character retry budget and delay.
    #[must_use]
    pub fn with_character_retries(mut self, extra_passes: u32, delay: Duration) -> Self {
        self.max_extra_passes = extra_passes;
        self.character_retry_delay = delay;
        self
    }

    /// Sets the overall run timeout.
    #[must_use]
    pub fn with_run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }
}

// ============================================================================
// Fetch Context
// ============================================================================

/// Shared resources for source fetchers.
#[derive(Debug, Clone)]
pub struct FetchContext {
    /// Shared HTTP client.
    pub http: Arc<HttpClient>,
    /// Run settings.
    pub settings: FetchSettings,
}

impl FetchContext {
    /// Creates a context with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_settings(FetchSettings::default())
    }

    /// Creates a context with custom settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_settings(settings: FetchSettings) -> Result<Self, FetchError> {
        Self::builder().settings(settings).build()
    }

    /// Creates a builder for customizing the context.
    pub fn builder() -> FetchContextBuilder {
        FetchContextBuilder::new()
    }

    /// Returns the per-request retry policy.
    pub fn retry(&self) -> &RetryPolicy {
        &self.settings.retry
    }
}

// ============================================================================
// Fetch Context Builder
// ============================================================================

/// Builder for constructing a `FetchContext`.
#[derive(Debug, Default)]
pub struct FetchContextBuilder {
    http: Option<Arc<HttpClient>>,
    settings: FetchSettings,
}

impl FetchContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP client.
    #[must_use]
    pub fn http(mut self, http: Arc<HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Sets the fetch settings.
    #[must_use]
    pub fn settings(mut self, settings: FetchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.settings.retry = retry;
        self
    }

    /// Builds the fetch context.
    ///
    /// # Errors
    ///
    /// Returns an error if no client was supplied and one cannot be built.
    pub fn build(self) -> Result<FetchContext, FetchError> {
        let http = match self.http {
            Some(http) => http,
            None => Arc::new(HttpClient::with_timeout(self.settings.request_timeout)?),
        };

        Ok(FetchContext {
            http,
            settings: self.settings,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = FetchSettings::default();
        assert_eq!(settings.concurrency, 3);
        assert_eq!(settings.max_extra_passes, 2);
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.request_timeout, Duration::from_secs(15));
        assert!(settings.run_timeout.is_none());
    }

    #[test]
    fn test_builder_uses_request_timeout() {
        let ctx = FetchContext::builder()
            .settings(FetchSettings::default().with_request_timeout(Duration::from_secs(4)))
            .retry(RetryPolicy::no_retry())
            .build()
            .unwrap();

        assert_eq!(ctx.http.timeout(), Duration::from_secs(4));
        assert_eq!(ctx.retry().max_attempts, 1);
    }
}
