// crates/fetcher/src/error.rs
//! Error types for upstream fetches

use thiserror::Error;

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while fetching an upstream feed.
///
/// `Clone` is required so a single in-flight fetch can fan its failure out to
/// every coalesced waiter.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Network-level failure: DNS, connection reset, TLS
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    /// The request exceeded the configured timeout
    #[error("Upstream request timed out")]
    Timeout,

    /// The upstream answered with a non-2xx status
    #[error("Upstream returned HTTP {0}")]
    HttpStatus(u16),
}

impl FetchError {
    /// Returns the upstream status code, if this error carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::HttpStatus(status) => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the failure happened before any HTTP response arrived
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Unavailable(_) | FetchError::Timeout)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Unavailable(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FetchError::Unavailable("dns failure".to_string());
        assert!(err.to_string().contains("Upstream unavailable"));
    }

    #[test]
    fn test_http_status_accessor() {
        let err = FetchError::HttpStatus(503);
        assert_eq!(err.status(), Some(503));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_transport_errors() {
        assert!(FetchError::Timeout.is_transport());
        assert!(FetchError::Unavailable("reset".to_string()).is_transport());
        assert_eq!(FetchError::Timeout.status(), None);
    }
}
