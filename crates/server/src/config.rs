// crates/server/src/config.rs
//! Declarative per-feed configuration

use podrelay_feed_parser::FeedFormat;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file parsed but the contents are unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Service configuration: one server block plus a declarative feed table.
///
/// Each feed carries its own rate-limit and TTL policy, so endpoint behavior
/// is data, not per-handler code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: SocketAddr,
    /// Serve the last good payload when a refresh fails
    pub serve_stale_on_error: bool,
    /// Upstream fetch timeout in seconds
    pub fetch_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            serve_stale_on_error: false,
            fetch_timeout_secs: 10,
        }
    }
}

/// How a feed's payload is served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    /// Normalized episode list as a JSON array
    #[default]
    Json,
    /// Raw upstream XML, byte for byte
    Passthrough,
}

/// One upstream feed endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Feed key; becomes the `/feed/{name}` path segment and the cache key
    pub name: String,
    /// Upstream feed URL
    pub url: String,
    #[serde(default = "default_format")]
    pub format: FeedFormat,
    #[serde(default)]
    pub mode: FeedMode,
    /// Cache lifetime in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Requests allowed per client per window
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Rate-limit window in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_format() -> FeedFormat {
    FeedFormat::Rss
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_limit() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    60
}

impl FeedConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Builds the Atom feed URL for a YouTube channel
pub fn youtube_feed_url(channel_id: &str) -> String {
    format!("https://www.youtube.com/feeds/videos.xml?channel_id={channel_id}")
}

impl Config {
    /// Loads and validates a TOML config file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        let mut seen = std::collections::HashSet::new();
        for feed in &self.feeds {
            if feed.name.is_empty() {
                return Err(ConfigError::Invalid("feed with empty name".to_string()));
            }
            if !seen.insert(feed.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate feed name '{}'",
                    feed.name
                )));
            }
            if feed.url.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "feed '{}' has an empty url",
                    feed.name
                )));
            }
            if feed.limit == 0 {
                return Err(ConfigError::Invalid(format!(
                    "feed '{}' has a zero rate limit",
                    feed.name
                )));
            }
            if feed.ttl_secs == 0 {
                return Err(ConfigError::Invalid(format!(
                    "feed '{}' has a zero ttl",
                    feed.name
                )));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    /// The built-in feed table, matching the service's original deployment
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            feeds: vec![
                FeedConfig {
                    name: "huberman".to_string(),
                    url: "https://feeds.megaphone.fm/GLT1412515089".to_string(),
                    format: FeedFormat::Rss,
                    mode: FeedMode::Json,
                    ttl_secs: 300,
                    limit: 5,
                    window_secs: 60,
                },
                FeedConfig {
                    name: "thispastweekend".to_string(),
                    url: "https://feeds.megaphone.fm/thispastweekendw".to_string(),
                    format: FeedFormat::Rss,
                    mode: FeedMode::Passthrough,
                    ttl_secs: 600,
                    limit: 5,
                    window_secs: 60,
                },
                FeedConfig {
                    name: "vergecast".to_string(),
                    url: "https://feeds.megaphone.fm/vergecast".to_string(),
                    format: FeedFormat::Rss,
                    mode: FeedMode::Passthrough,
                    ttl_secs: 600,
                    limit: 10,
                    window_secs: 20,
                },
                FeedConfig {
                    name: "youtube".to_string(),
                    url: youtube_feed_url("UCzQUP1qoWDoEbmsQxvdjxgQ"),
                    format: FeedFormat::Atom,
                    mode: FeedMode::Passthrough,
                    ttl_secs: 600,
                    limit: 5,
                    window_secs: 60,
                },
            ],
        }
    }
}
