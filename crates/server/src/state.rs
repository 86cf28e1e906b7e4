// crates/server/src/state.rs
//! Shared application state

use crate::config::{Config, FeedConfig};
use crate::error::RefreshError;
use bytes::Bytes;
use podrelay_cache::TtlCache;
use podrelay_feed_parser::Episode;
use podrelay_fetcher::{FeedFetcher, FetchResult, FetcherConfig};
use podrelay_limiter::RateLimiter;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// What the cache stores for one feed key
#[derive(Debug, Clone)]
pub enum FeedPayload {
    /// Normalized episode list (json mode)
    Episodes(Arc<Vec<Episode>>),
    /// Raw upstream document (passthrough mode)
    Raw { body: Bytes, content_type: String },
}

/// The service-wide feed cache, partitioned by feed key
pub type FeedCache = TtlCache<FeedPayload, RefreshError>;

/// Per-feed runtime state: declarative config plus this endpoint's limiter
#[derive(Debug)]
pub struct FeedRuntime {
    pub config: FeedConfig,
    pub limiter: RateLimiter,
}

/// Everything a request handler needs. Stores are created once at service
/// start and torn down at shutdown; nothing lives in module-level statics.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: FeedFetcher,
    pub cache: Arc<FeedCache>,
    pub feeds: Arc<HashMap<String, FeedRuntime>>,
}

impl AppState {
    pub fn new(config: &Config) -> FetchResult<Self> {
        let fetcher = FeedFetcher::with_config(FetcherConfig {
            timeout: Duration::from_secs(config.server.fetch_timeout_secs),
            ..FetcherConfig::default()
        })?;

        let cache =
            Arc::new(FeedCache::new().with_serve_stale_on_error(config.server.serve_stale_on_error));

        let feeds = config
            .feeds
            .iter()
            .map(|feed| {
                let limiter = RateLimiter::new(feed.limit, feed.window());
                (
                    feed.name.clone(),
                    FeedRuntime {
                        config: feed.clone(),
                        limiter,
                    },
                )
            })
            .collect();

        Ok(Self {
            fetcher,
            cache,
            feeds: Arc::new(feeds),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_builds_one_limiter_per_feed() {
        let config = Config::default();
        let state = AppState::new(&config).expect("Should build state");

        assert_eq!(state.feeds.len(), config.feeds.len());
        let verge = state.feeds.get("vergecast").expect("Should have vergecast");
        assert_eq!(verge.limiter.limit(), 10);
        assert_eq!(verge.limiter.window(), Duration::from_secs(20));
    }

    #[test]
    fn test_cache_starts_empty() {
        let state = AppState::new(&Config::default()).expect("Should build state");
        assert!(state.cache.is_empty());
    }
}
