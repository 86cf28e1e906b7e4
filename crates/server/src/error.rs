// crates/server/src/error.rs
//! Request-scoped error type and its HTTP mapping

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use podrelay_feed_parser::ParseError;
use podrelay_fetcher::FetchError;
use podrelay_limiter::RateLimitError;
use serde::Serialize;
use thiserror::Error;

/// Result type for request handling
pub type AppResult<T> = Result<T, AppError>;

/// Failure of one cache refresh: the upstream fetch or the normalization.
///
/// `Clone` so the cache can hand the same failure to every coalesced waiter.
#[derive(Debug, Clone, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Unified per-request error. Nothing here is fatal to the process; every
/// variant maps onto a response for the one request that hit it.
#[derive(Debug, Error)]
pub enum AppError {
    /// Requested feed name is not configured
    #[error("unknown feed: {0}")]
    UnknownFeed(String),

    /// Client exhausted its window for this endpoint
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),

    /// Upstream fetch failed
    #[error(transparent)]
    Upstream(#[from] FetchError),

    /// Upstream document could not be normalized
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl From<RefreshError> for AppError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Fetch(e) => AppError::Upstream(e),
            RefreshError::Parse(e) => AppError::Parse(e),
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::UnknownFeed(name) => {
                tracing::debug!("request for unknown feed '{}'", name);
                error_response(StatusCode::NOT_FOUND, "Unknown feed")
            }
            AppError::RateLimited(e) => {
                let mut response = error_response(
                    StatusCode::TOO_MANY_REQUESTS,
                    "Too many requests. Please try again later.",
                );
                if let Ok(value) = HeaderValue::from_str(&e.retry_after_secs().to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            // internal detail goes to the log, clients get a generic message
            AppError::Upstream(e) => {
                tracing::error!("upstream fetch failed: {}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch feed")
            }
            AppError::Parse(e) => {
                tracing::error!("feed normalization failed: {}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to parse feed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_rate_limited_response() {
        let err = AppError::RateLimited(RateLimitError::Exceeded {
            limit: 5,
            window: Duration::from_secs(60),
            retry_after: Duration::from_secs(42),
        });

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
            Some("42")
        );
    }

    #[test]
    fn test_upstream_failure_is_500() {
        let err = AppError::Upstream(FetchError::HttpStatus(503));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unknown_feed_is_404() {
        let err = AppError::UnknownFeed("nope".to_string());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_refresh_error_maps_through() {
        let err: AppError = RefreshError::Parse(ParseError::MalformedXml("bad".to_string())).into();
        assert!(matches!(err, AppError::Parse(_)));
    }
}
