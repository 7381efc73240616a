//! Provider error types.

use thiserror::Error;

/// Errors that can occur when talking to an outcome generator or curriculum service.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested endpoint or model does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The body arrived but could not be read as the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Map a transport failure, keeping timeouts distinguishable.
    pub(crate) fn from_transport(e: reqwest::Error, timeout_secs: u64) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout(timeout_secs)
        } else {
            ProviderError::NetworkError(e.to_string())
        }
    }

    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. }
                | ProviderError::Timeout(_)
                | ProviderError::NetworkError(_)
        ) || matches!(self, ProviderError::ApiError { status, .. } if *status >= 500)
    }
}

/// Turn a non-success response into a `ProviderError`.
///
/// `what` names the resource for 404s. `extract_message` pulls a message out
/// of a structured error body when the API has one.
pub(crate) async fn error_for_status(
    response: reqwest::Response,
    what: &str,
    extract_message: fn(&str) -> Option<String>,
) -> ProviderError {
    let status = response.status().as_u16();
    if status == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5)
            * 1000;
        return ProviderError::RateLimited {
            retry_after_ms: retry_after,
        };
    }
    let body = response.text().await.unwrap_or_default();
    match status {
        401 | 403 => ProviderError::AuthenticationFailed(body),
        404 => ProviderError::NotFound(what.to_string()),
        _ => ProviderError::ApiError {
            status,
            message: extract_message(&body).unwrap_or(body),
        },
    }
}
