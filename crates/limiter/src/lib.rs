// crates/limiter/src/lib.rs
//! Per-client admission control for feed endpoints
//!
//! # Example
//!
//! ```rust
//! use podrelay_limiter::RateLimiter;
//! use std::time::Duration;
//!
//! // 5 requests per client per minute
//! let limiter = RateLimiter::new(5, Duration::from_secs(60));
//! assert!(limiter.admit("203.0.113.7").is_ok());
//! ```

mod error;
mod rate_limiter;

pub use error::{LimiterResult, RateLimitError};
pub use rate_limiter::RateLimiter;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_exports_accessible() {
        // Verify all types are exported
        let limiter = RateLimiter::new(100, std::time::Duration::from_secs(1));
        let _: LimiterResult<()> = limiter.admit("client");
    }
}
