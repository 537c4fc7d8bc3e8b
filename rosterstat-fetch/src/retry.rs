//! Retry policy for upstream requests.
//!
//! [`RetryPolicy::execute`] runs one request closure in a bounded loop:
//!
//! - `NotFound`, non-retryable 4xx, malformed responses and token endpoint
//!   failures return immediately.
//! - `Unauthorized` refreshes the token once per call and retries without
//!   delay. A second rejection is returned as-is.
//! - `RateLimited` waits for the server-supplied `Retry-After`, falling back
//!   to backoff.
//! - Transient network errors wait for backoff.
//!
//! Backoff is `base_delay * multiplier^(attempt - 1)`, capped at `max_delay`.

use std::future::Future;
use std::time::Duration;

use rosterstat_core::ErrorKind;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::token::TokenCache;

/// Default number of attempts per request.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the second attempt.
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Default upper bound on a single backoff delay.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Default backoff growth factor.
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

// ============================================================================
// Retry Outcome
// ============================================================================

/// A successful result and the number of attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome<T> {
    /// The successful value.
    pub value: T,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

// ============================================================================
// Retry Policy
// ============================================================================

/// Bounded exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound on a single delay.
    pub max_delay: Duration,
    /// Growth factor between attempts.
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Creates a policy with the given attempt limit and default delays.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Calculates the backoff after a failed `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.backoff_multiplier.max(1.0).powi(exponent);
        let secs = self.base_delay.as_secs_f64() * factor;

        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails terminally, or attempts run out.
    ///
    /// When `tokens` is set, a bearer token is fetched from the cache before
    /// every attempt and passed to `op`.
    ///
    /// # Errors
    ///
    /// Returns the terminal error, or [`FetchError::RetriesExhausted`]
    /// wrapping the last error once `max_attempts` is reached.
    pub async fn execute<T, F, Fut>(
        &self,
        tokens: Option<&TokenCache>,
        mut op: F,
    ) -> Result<RetryOutcome<T>, FetchError>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0;
        let mut refreshed = false;

        loop {
            attempt += 1;

            let bearer = match tokens {
                Some(cache) => Some(cache.get_token().await?),
                None => None,
            };

            let error = match op(bearer.clone()).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Request succeeded after retry");
                    }
                    return Ok(RetryOutcome {
                        value,
                        attempts: attempt,
                    });
                }
                Err(error) => error,
            };

            let delay = match error.kind() {
                ErrorKind::Unauthorized => match (tokens, bearer) {
                    (Some(cache), Some(stale)) if !refreshed && attempt < self.max_attempts => {
                        refreshed = true;
                        warn!(api = %cache.label(), attempt, "Token rejected, refreshing");
                        cache.refresh_after_rejection(&stale).await?;
                        Duration::ZERO
                    }
                    _ => return Err(error),
                },
                ErrorKind::RateLimited => error
                    .retry_after()
                    .unwrap_or_else(|| self.delay_for_attempt(attempt)),
                ErrorKind::TransientNetwork => self.delay_for_attempt(attempt),
                _ => return Err(error),
            };

            if attempt >= self.max_attempts {
                warn!(attempts = attempt, error = %error, "Retries exhausted");
                return Err(FetchError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            warn!(
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "Retrying request"
            );

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn transient() -> FetchError {
        FetchError::Transient("connection reset".to_string())
    }

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(8));
    }

    #[test]
    fn test_max_delay_cap() {
        let policy = RetryPolicy::new(10).with_base_delay(Duration::from_secs(10));

        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(60));
        assert_eq!(policy.delay_for_attempt(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_is_non_decreasing() {
        let policy = RetryPolicy::new(10).with_base_delay(Duration::from_millis(300));
        let delays: Vec<_> = (1..=10).map(|a| policy.delay_for_attempt(a)).collect();
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_not_retried() {
        let mut calls = 0;
        let result: Result<RetryOutcome<()>, _> = RetryPolicy::default()
            .execute(None, |_| {
                calls += 1;
                async {
                    Err(FetchError::NotFound {
                        url: "/character".to_string(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(FetchError::NotFound { .. })));
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_request_is_not_retried() {
        let mut calls = 0;
        let result: Result<RetryOutcome<()>, _> = RetryPolicy::default()
            .execute(None, |_| {
                calls += 1;
                async {
                    Err(FetchError::HttpStatus {
                        status: 400,
                        body: "bad realm".to_string(),
                    })
                }
            })
            .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::MalformedRequest);
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_then_success() {
        let start = Instant::now();
        let mut calls = 0;
        let outcome = RetryPolicy::default()
            .execute(None, |_| {
                calls += 1;
                let n = calls;
                async move { if n < 3 { Err(transient()) } else { Ok("done") } }
            })
            .await
            .unwrap();

        assert_eq!(outcome.value, "done");
        assert_eq!(outcome.attempts, 3);
        // 2s after the first failure, 4s after the second.
        assert!(start.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_attempts() {
        let mut calls = 0;
        let result: Result<RetryOutcome<()>, _> = RetryPolicy::default()
            .execute(None, |_| {
                calls += 1;
                async { Err(transient()) }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts(), Some(3));
        assert_eq!(err.kind(), ErrorKind::TransientNetwork);
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_honors_retry_after() {
        let mut last_call: Option<Instant> = None;
        let mut gaps = Vec::new();
        let mut calls = 0;

        let outcome = RetryPolicy::default()
            .execute(None, |_| {
                let now = Instant::now();
                if let Some(prev) = last_call.replace(now) {
                    gaps.push(now - prev);
                }
                calls += 1;
                let n = calls;
                async move {
                    if n == 1 {
                        Err(FetchError::RateLimited {
                            retry_after: Some(Duration::from_secs(7)),
                        })
                    } else {
                        Ok(n)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 2);
        assert!(gaps[0] >= Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_without_hint_backs_off() {
        let mut last_call: Option<Instant> = None;
        let mut gaps = Vec::new();

        let result: Result<RetryOutcome<()>, _> = RetryPolicy::default()
            .execute(None, |_| {
                let now = Instant::now();
                if let Some(prev) = last_call.replace(now) {
                    gaps.push(now - prev);
                }
                async { Err(FetchError::RateLimited { retry_after: None }) }
            })
            .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::RateLimited);
        assert_eq!(gaps.len(), 2);
        assert!(gaps[0] >= Duration::from_secs(2));
        assert!(gaps[1] >= gaps[0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_without_token_cache_fails_fast() {
        let mut calls = 0;
        let result: Result<RetryOutcome<()>, _> = RetryPolicy::default()
            .execute(None, |_| {
                calls += 1;
                async { Err(FetchError::Unauthorized { status: 401 }) }
            })
            .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Unauthorized);
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_retry_policy() {
        let mut calls = 0;
        let result: Result<RetryOutcome<()>, _> = RetryPolicy::no_retry()
            .execute(None, |_| {
                calls += 1;
                async { Err(transient()) }
            })
            .await;

        assert_eq!(result.unwrap_err().attempts(), Some(1));
        assert_eq!(calls, 1);
    }
}
