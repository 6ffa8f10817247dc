//! Shared HTTP plumbing for the vendor adapters.

use std::time::{Duration, Instant};

use llmrelay_core::error::RelayError;
use llmrelay_core::types::GenerationFailure;
use reqwest::header::HeaderMap;

/// Whole-request timeout for generation calls.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for key validation and model listing.
pub(crate) const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

const RATE_LIMIT_HEADERS: [&str; 2] = ["x-ratelimit-remaining", "x-ratelimit-remaining-requests"];

/// Build the connection-pooled client used by an adapter.
pub(crate) fn build_client() -> Result<reqwest::Client, RelayError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| RelayError::Config(format!("failed to build HTTP client: {e}")))
}

/// Join a base URL and a path, tolerating a trailing slash on the base.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Remaining-calls hint from the response headers, if the vendor sent one.
pub(crate) fn rate_limit_remaining(headers: &HeaderMap) -> Option<u64> {
    RATE_LIMIT_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    })
}

/// Failure for a transport or decoding error.
///
/// The request URL is dropped from the error text.
pub(crate) fn exception(err: reqwest::Error, started: Instant) -> GenerationFailure {
    let err = err.without_url();
    GenerationFailure::new(format!("Exception: {err}"), started.elapsed())
}

/// Failure for a non-2xx response. Consumes the body for the snippet.
pub(crate) async fn api_error(response: reqwest::Response, started: Instant) -> GenerationFailure {
    let status = response.status().as_u16();
    let remaining = rate_limit_remaining(response.headers());
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());

    GenerationFailure::new(format!("API Error: {status}"), started.elapsed())
        .with_status(status)
        .with_response(&body)
        .with_rate_limit(remaining)
}
