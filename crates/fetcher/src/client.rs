// crates/fetcher/src/client.rs
//! HTTP client for upstream feed retrieval

use crate::error::{FetchError, FetchResult};
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client as ReqwestClient;
use std::time::Duration;

/// Content type assumed when the upstream omits the header
const DEFAULT_CONTENT_TYPE: &str = "application/xml";

/// Fetcher configuration
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Request timeout, covering connect through body read
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: format!("podrelay/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// The raw bytes of one upstream response
#[derive(Debug, Clone)]
pub struct FetchedBody {
    /// Response body
    pub body: Bytes,
    /// Upstream Content-Type, or [`DEFAULT_CONTENT_TYPE`] when absent
    pub content_type: String,
}

/// Stateless upstream fetcher.
///
/// Performs exactly one bounded GET per call; no retries. Retry policy, if
/// any, belongs to the caller. Safe to clone and call concurrently.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    inner: ReqwestClient,
}

impl FeedFetcher {
    /// Creates a fetcher with default configuration
    pub fn new() -> FetchResult<Self> {
        Self::with_config(FetcherConfig::default())
    }

    /// Creates a fetcher with custom configuration
    pub fn with_config(config: FetcherConfig) -> FetchResult<Self> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { inner: client })
    }

    /// Fetches one URL, mapping every failure mode into [`FetchError`]
    pub async fn fetch(&self, url: &str) -> FetchResult<FetchedBody> {
        log::debug!("fetching upstream feed: {}", url);

        let response = self.inner.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            log::warn!("upstream {} answered {}", url, status);
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let body = response.bytes().await?;

        Ok(FetchedBody { body, content_type })
    }
}
