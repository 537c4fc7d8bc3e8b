//! HTTP client with tracing and response classification.
//!
//! Every request returns the response body on 2xx, or a [`FetchError`] whose
//! variant tells the retry policy what to do next:
//!
//! | Status            | Error                  |
//! |-------------------|------------------------|
//! | 404               | `NotFound`             |
//! | 401, 403          | `Unauthorized`         |
//! | 429               | `RateLimited`          |
//! | 408, 5xx          | `Transient`            |
//! | other 4xx         | `HttpStatus`           |
//! | transport failure | `Timeout`/`Transient`  |

use std::time::{Duration, SystemTime};

use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use crate::error::FetchError;

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// User agent string for RosterStat.
const USER_AGENT: &str = concat!("RosterStat/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in `HttpStatus` errors.
const MAX_ERROR_BODY: usize = 200;

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper shared by every source fetcher.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Creates a new HTTP client with the default timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new HTTP client with a custom per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let inner = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Client(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { inner, timeout })
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Performs a GET request with query parameters and an optional bearer token.
    #[instrument(skip(self, query, bearer), fields(url = %url))]
    pub async fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        bearer: Option<&str>,
    ) -> Result<String, FetchError> {
        debug!("GET request");
        let request = with_bearer(self.inner.get(url).query(query), bearer);
        Self::send(request, url).await
    }

    /// Performs a POST request with a JSON body and an optional bearer token.
    #[instrument(skip(self, body, bearer), fields(url = %url))]
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        bearer: Option<&str>,
    ) -> Result<String, FetchError> {
        debug!("POST request with JSON");
        let request = with_bearer(self.inner.post(url).json(body), bearer);
        Self::send(request, url).await
    }

    /// Performs a POST request with form data and HTTP basic auth.
    #[instrument(skip(self, form, username, password), fields(url = %url))]
    pub async fn post_form_basic<T: Serialize + ?Sized>(
        &self,
        url: &str,
        form: &T,
        username: &str,
        password: &str,
    ) -> Result<String, FetchError> {
        debug!("POST request with form data");
        let request = self
            .inner
            .post(url)
            .basic_auth(username, Some(password))
            .form(form);
        Self::send(request, url).await
    }

    async fn send(request: RequestBuilder, url: &str) -> Result<String, FetchError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(status = %status, "Response received");

        if status.is_success() {
            return Ok(response.text().await?);
        }

        let retry_after = response.retry_after();
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, retry_after, url, &body))
    }
}

fn with_bearer(request: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
    match bearer {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Maps a non-success status to the error the retry policy acts on.
pub fn classify_status(
    status: StatusCode,
    retry_after: Option<Duration>,
    url: &str,
    body: &str,
) -> FetchError {
    match status {
        StatusCode::NOT_FOUND => FetchError::NotFound {
            url: url.to_string(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchError::Unauthorized {
            status: status.as_u16(),
        },
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited { retry_after },
        StatusCode::REQUEST_TIMEOUT => FetchError::Transient(format!("HTTP {status}")),
        s if s.is_server_error() => FetchError::Transient(format!("HTTP {status}")),
        s => FetchError::HttpStatus {
            status: s.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY).collect(),
        },
    }
}

/// Builds a URL by appending percent-encoded path segments to `base`.
pub fn build_url(base: &str, segments: &[&str]) -> Result<Url, FetchError> {
    let mut url =
        Url::parse(base).map_err(|e| FetchError::Client(format!("invalid URL {base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| FetchError::Client(format!("URL cannot have a path: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

// ============================================================================
// Retry-After
// ============================================================================

/// Parses a `Retry-After` header value.
///
/// Accepts delta-seconds (`120`) and HTTP-date
/// (`Wed, 21 Oct 2015 07:28:00 GMT`) forms. Dates in the past yield zero.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    if let Ok(fractional) = value.parse::<f64>() {
        return Duration::try_from_secs_f64(fractional).ok();
    }

    let date = httpdate::parse_http_date(value).ok()?;
    Some(
        date.duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO),
    )
}

// ============================================================================
// Response Extensions
// ============================================================================

/// Extension trait for Response handling.
pub trait ResponseExt {
    /// Get the parsed Retry-After header.
    fn retry_after(&self) -> Option<Duration>;
}

impl ResponseExt for Response {
    fn retry_after(&self) -> Option<Duration> {
        self.headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_eq, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_classify_status() {
        let classify = |code: u16| {
            classify_status(StatusCode::from_u16(code).unwrap(), None, "http://x", "")
        };

        assert!(matches!(classify(404), FetchError::NotFound { .. }));
        assert!(matches!(classify(401), FetchError::Unauthorized { status: 401 }));
        assert!(matches!(classify(403), FetchError::Unauthorized { status: 403 }));
        assert!(matches!(classify(429), FetchError::RateLimited { .. }));
        assert!(matches!(classify(500), FetchError::Transient(_)));
        assert!(matches!(classify(503), FetchError::Transient(_)));
        assert!(matches!(classify(408), FetchError::Transient(_)));
        assert!(matches!(classify(400), FetchError::HttpStatus { status: 400, .. }));
        assert!(matches!(classify(422), FetchError::HttpStatus { status: 422, .. }));
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after(" 0 "), Some(Duration::ZERO));
        assert_eq!(parse_retry_after("1.5"), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_parse_retry_after_http_date() {
        let future = SystemTime::now() + Duration::from_secs(90);
        let header = httpdate::fmt_http_date(future);
        let parsed = parse_retry_after(&header).unwrap();
        assert!(parsed > Duration::from_secs(80));
        assert!(parsed <= Duration::from_secs(90));

        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_parse_retry_after_invalid() {
        assert_eq!(parse_retry_after("soon"), None);
        assert_eq!(parse_retry_after("-5"), None);
        assert_eq!(parse_retry_after(""), None);
    }

    #[test]
    fn test_build_url_encodes_segments() {
        let url = build_url(
            "https://kr.api.blizzard.com/",
            &["profile", "wow", "character", "azshara", "불꽃마법사"],
        )
        .unwrap();
        assert!(url.as_str().starts_with(
            "https://kr.api.blizzard.com/profile/wow/character/azshara/%EB%B6%88"
        ));
    }

    #[tokio::test]
    async fn test_get_sends_query_and_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .and(query_param("region", "kr"))
            .and(header_eq("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let body = client
            .get(&format!("{}/data", server.uri()), &[("region", "kr")], Some("tok"))
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_rate_limit_reads_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let err = client
            .post_json(&format!("{}/graphql", server.uri()), &serde_json::json!({}), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FetchError::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(7)
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let client = HttpClient::with_timeout(Duration::from_secs(1)).unwrap();
        let err = client.get("http://127.0.0.1:1/", &[], None).await.unwrap_err();
        assert_eq!(err.kind(), rosterstat_core::ErrorKind::TransientNetwork);
    }
}
