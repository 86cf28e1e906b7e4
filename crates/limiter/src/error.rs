// crates/limiter/src/error.rs
//! Error types for admission control

use std::time::Duration;
use thiserror::Error;

/// Result type for limiter operations
pub type LimiterResult<T> = Result<T, RateLimitError>;

/// Denial returned when a client exhausts its window
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    /// Rate limit exceeded for this client
    #[error("Rate limit exceeded (limit: {limit} per {window:?}), retry after {retry_after:?}")]
    Exceeded {
        limit: u32,
        window: Duration,
        /// Time until the client's window resets
        retry_after: Duration,
    },
}

impl RateLimitError {
    /// Retry hint in whole seconds, rounded up and never zero
    pub fn retry_after_secs(&self) -> u64 {
        let RateLimitError::Exceeded { retry_after, .. } = self;
        (retry_after.as_secs_f64().ceil() as u64).max(1)
    }
}
