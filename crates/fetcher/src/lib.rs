// crates/fetcher/src/lib.rs
//! Upstream feed retrieval over HTTP

mod client;
mod error;

pub use client::{FeedFetcher, FetchedBody, FetcherConfig};
pub use error::{FetchError, FetchResult};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_exports_accessible() {
        // Verify all types are exported
        let fetcher = FeedFetcher::new().expect("Failed to create fetcher");
        let _ = fetcher.clone();
        let _: FetcherConfig = FetcherConfig::default();
    }
}
