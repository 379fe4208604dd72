//! JSON HTTP client used to talk to the analysis service.
//!
//! - JSON POST against a base URL with an optional bearer token
//! - Retries network failures, 429 and 5xx with exponential backoff and
//!   `Retry-After` support
//! - Never logs credential values; optional raw request/response logging via
//!   `SLANT_HTTP_RAW=1` (target `http.raw`)
//!
//! Example (no_run):
//! ```no_run
//! # async fn demo() -> Result<(), slant_http::HttpError> {
//! let client = slant_http::HttpClient::new("https://api.example.com/")?;
//! let got: serde_json::Value = client
//!     .post_json("check-date-updated", &serde_json::json!({"url": "https://e.com/a"}), slant_http::RequestOpts::bearer(Some("t")))
//!     .await?;
//! # Ok(()) }
//! ```

use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;

const RAW_ENV: &str = "SLANT_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;
const BASE_BACKOFF_MS: u64 = 200;
const RATE_LIMIT_FLOOR: Duration = Duration::from_millis(1100);

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// Short message suitable for end users (no request ids or body dumps).
    pub fn user_message(&self) -> String {
        match self {
            HttpError::Api {
                status, message, ..
            } => format!("The analysis service returned {status}: {message}"),
            HttpError::Network(_) => "Could not reach the analysis service".to_string(),
            HttpError::Decode(..) => "The analysis service sent an unexpected response".to_string(),
            HttpError::Url(e) | HttpError::Build(e) => format!("Invalid request: {e}"),
        }
    }
}

/// Per-request tuning knobs.
///
/// ```
/// use slant_http::RequestOpts;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     ..RequestOpts::bearer(Some("t"))
/// };
/// assert_eq!(opts.bearer, Some("t"));
/// assert_eq!(opts.retries, None);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    /// Sent as `Authorization: Bearer <token>`; never logged.
    pub bearer: Option<&'a str>,
}

impl<'a> RequestOpts<'a> {
    /// Options carrying an optional bearer token and nothing else.
    pub fn bearer(token: Option<&'a str>) -> Self {
        Self {
            bearer: token,
            ..Default::default()
        }
    }
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// ```no_run
    /// use slant_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com/")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// assert_eq!(client.max_retries, 2);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(15),
            max_retries: 2,
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    /// POST `body` as JSON to `path` (relative to the base) and decode the
    /// JSON answer.
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.resolve(path)?;
        let body_bytes = serde_json::to_vec(body)
            .map_err(|e| HttpError::Build(format!("body serialization failed: {e}")))?;
        let token = opts.bearer.map(sanitize_token).transpose()?;
        let max_retries = opts.retries.unwrap_or(self.max_retries);
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let req_id = format!("r{}", uuid::Uuid::new_v4().simple());

        let mut attempt = 0usize;
        loop {
            let rb = self.build_request(&url, &body_bytes, token.as_deref(), timeout);

            tracing::debug!(
                req_id=%req_id,
                attempt=attempt + 1,
                max_retries,
                host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
                timeout_ms=timeout.as_millis() as u64,
                has_bearer=token.is_some(),
                body_len=body_bytes.len(),
                "http.request.start"
            );
            if raw_enabled() {
                let curl = make_curl(&url, token.is_some(), &body_bytes);
                tracing::debug!(target: "http.raw", %req_id, %curl, "request");
            }

            let t0 = Instant::now();
            let sent = match rb.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let headers = resp.headers().clone();
                    resp.bytes().await.map(|b| (status, headers, b))
                }
                Err(err) => Err(err),
            };

            let (status, headers, bytes) = match sent {
                Ok(parts) => parts,
                Err(err) => {
                    let message = err.to_string();
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = exponential_backoff(attempt);
                        tracing::warn!(
                            req_id=%req_id,
                            attempt,
                            max_retries,
                            backoff_ms=delay.as_millis() as u64,
                            message=%message,
                            "http.retrying.network"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(req_id=%req_id, attempt, message=%message, "http.network_error");
                    return Err(HttpError::Network(message));
                }
            };

            let duration_ms = t0.elapsed().as_millis() as u64;
            let server_req_id = headers
                .get("x-request-id")
                .or_else(|| headers.get("x-correlation-id"))
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string();
            let snippet = snip_body(&bytes);

            tracing::debug!(
                req_id=%req_id,
                %status,
                duration_ms,
                body_len=bytes.len(),
                x_request_id=%server_req_id,
                "http.response"
            );
            if raw_enabled() {
                let mut raw = bytes.to_vec();
                let truncated = raw.len() > RAW_MAX_BODY;
                raw.truncate(RAW_MAX_BODY);
                tracing::info!(
                    target: "http.raw",
                    %req_id,
                    %status,
                    duration_ms,
                    body=%String::from_utf8_lossy(&raw),
                    truncated
                );
            }

            if status.is_success() {
                return serde_json::from_slice::<T>(&bytes).map_err(|e| {
                    tracing::warn!(
                        req_id=%req_id,
                        serde_line=e.line(),
                        serde_col=e.column(),
                        serde_err=%e,
                        body_snippet=%snippet,
                        "http.response.decode_error"
                    );
                    HttpError::Decode(e.to_string(), snippet)
                });
            }

            let message = extract_error_message(&bytes);
            let is_429 = status == StatusCode::TOO_MANY_REQUESTS;
            if (is_429 || status.is_server_error()) && attempt < max_retries {
                attempt += 1;
                let delay = match retry_after_delay_secs(&headers) {
                    Some(secs) => Duration::from_secs(secs),
                    None if is_429 => exponential_backoff(attempt).max(RATE_LIMIT_FLOOR),
                    None => exponential_backoff(attempt),
                };
                tracing::warn!(
                    req_id=%req_id,
                    %status,
                    attempt,
                    max_retries,
                    backoff_ms=delay.as_millis() as u64,
                    message=%message,
                    "http.retrying"
                );
                sleep(delay).await;
                continue;
            }

            tracing::warn!(
                req_id=%req_id,
                %status,
                message=%message,
                x_request_id=%server_req_id,
                body_snippet=%snippet,
                "http.error"
            );
            return Err(HttpError::Api {
                status,
                message,
                request_id: server_req_id,
            });
        }
    }

    fn resolve(&self, path: &str) -> Result<Url, HttpError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| HttpError::Url(e.to_string()))
    }

    fn build_request(
        &self,
        url: &Url,
        body: &[u8],
        token: Option<&str>,
        timeout: Duration,
    ) -> RequestBuilder {
        let rb = self
            .inner
            .post(url.clone())
            .timeout(timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_vec());
        match token {
            Some(tok) => rb.bearer_auth(tok),
            None => rb,
        }
    }
}

fn exponential_backoff(attempt: usize) -> Duration {
    let shift = attempt.saturating_sub(1).min(16) as u32;
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(1u64 << shift))
}

/// Render a best-effort curl command for repro/debug, with credentials redacted.
fn make_curl(url: &Url, has_bearer: bool, body: &[u8]) -> String {
    let mut parts = vec![
        "curl".to_string(),
        "-XPOST".to_string(),
        "-H 'content-type: application/json'".to_string(),
    ];
    if has_bearer {
        parts.push("-H 'authorization: Bearer <redacted>'".to_string());
    }
    match std::str::from_utf8(body) {
        Ok(s) => {
            let mut s = s.to_string();
            if s.len() > RAW_MAX_BODY {
                s.truncate(floor_char_boundary(&s, RAW_MAX_BODY));
                s.push_str("...");
            }
            parts.push(format!("-d '{}'", s.replace('\'', r"'\''")));
        }
        Err(_) => parts.push(format!("--data-binary @- # ({} bytes)", body.len())),
    }
    parts.push(format!("'{}'", url.as_str()));
    parts.join(" ")
}

/// Pull a human-readable message out of common error envelopes:
/// `{"error":{"message":..}}`, `{"message":..}`, `{"detail":..}`, `{"error":".."}`.
fn extract_error_message(body: &[u8]) -> String {
    #[derive(Deserialize)]
    struct Nested {
        error: NestedDetail,
    }
    #[derive(Deserialize)]
    struct NestedDetail {
        message: String,
    }
    #[derive(Deserialize)]
    struct Flat {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: serde_json::Value,
        #[serde(default)]
        error: serde_json::Value,
    }

    if let Ok(env) = serde_json::from_slice::<Nested>(body) {
        return env.error.message;
    }
    if let Ok(m) = serde_json::from_slice::<Flat>(body) {
        if !m.message.is_empty() {
            return m.message;
        }
        if let Some(s) = m.detail.as_str().filter(|s| !s.is_empty()) {
            return s.to_string();
        }
        if let Some(s) = m.error.as_str().filter(|s| !s.is_empty()) {
            return s.to_string();
        }
    }
    snip_body(body)
}

fn retry_after_delay_secs(h: &HeaderMap) -> Option<u64> {
    h.get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .trim()
        .parse()
        .ok()
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    let mut idx = max.min(s.len());
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > SNIPPET_MAX {
        snip.truncate(floor_char_boundary(&snip, SNIPPET_MAX));
        snip.push_str("...");
    }
    snip
}

fn sanitize_token(raw: &str) -> Result<String, HttpError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    s.retain(|ch| !ch.is_ascii_whitespace());

    if !s.is_ascii() {
        return Err(HttpError::Build("token contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build("token contains control characters".into()));
    }
    HeaderValue::from_str(&format!("Bearer {s}"))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        assert_eq!(exponential_backoff(1), Duration::from_millis(200));
        assert_eq!(exponential_backoff(2), Duration::from_millis(400));
        assert_eq!(exponential_backoff(3), Duration::from_millis(800));
    }

    #[test]
    fn error_message_envelopes() {
        assert_eq!(extract_error_message(br#"{"error":{"message":"nested"}}"#), "nested");
        assert_eq!(extract_error_message(br#"{"message":"flat"}"#), "flat");
        assert_eq!(extract_error_message(br#"{"detail":"Not found"}"#), "Not found");
        assert_eq!(extract_error_message(br#"{"error":"bad"}"#), "bad");
        assert_eq!(extract_error_message(b"plain text"), "plain text");
    }

    #[test]
    fn token_is_sanitized() {
        assert_eq!(sanitize_token(" \"abc def\" ").unwrap(), "abcdef");
        assert!(sanitize_token("t\u{7f}").is_err());
        assert!(sanitize_token("tök").is_err());
    }

    #[test]
    fn snippet_is_truncated_on_char_boundary() {
        let body = "é".repeat(400);
        let snip = snip_body(body.as_bytes());
        assert!(snip.ends_with("..."));
        assert!(snip.len() <= SNIPPET_MAX + 3);
    }

    #[test]
    fn relative_paths_join_base() {
        let client = HttpClient::new("https://api.example.com/v1/").unwrap();
        let url = client.resolve("/articles/quick-parse").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/articles/quick-parse");
    }

    #[test]
    fn curl_redacts_the_token() {
        let url = Url::parse("https://api.example.com/check-date-updated").unwrap();
        let curl = make_curl(&url, true, br#"{"url":"it's"}"#);
        assert!(curl.contains("Bearer <redacted>"));
        assert!(curl.contains(r#"-d '{"url":"it'\''s"}'"#));
    }
}
