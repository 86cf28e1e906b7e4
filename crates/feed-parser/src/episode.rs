// crates/feed-parser/src/episode.rs
//! Normalized episode data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Artwork URL served when a feed item carries no usable image of its own
pub const PLACEHOLDER_ARTWORK_URL: &str = "https://via.placeholder.com/300x300?text=No+Image";

/// Feed syntax family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    /// RSS 2.0 feed
    Rss,
    /// Atom feed
    Atom,
}

/// A single normalized feed item.
///
/// Every field degrades rather than fails: an item missing a title, date or
/// enclosure still becomes an `Episode` with empty or `None` fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Item title, empty if absent
    pub title: String,
    /// Item description, verbatim HTML; sanitization is the renderer's job
    pub description_html: String,
    /// Publication time; `None` when the source date is missing or unparseable
    pub published_at: Option<DateTime<Utc>>,
    /// Provider-dependent duration label (e.g. itunes duration text)
    pub duration_label: Option<String>,
    /// Absolute URL of the playable asset; empty means unplayable
    pub media_url: String,
    /// Artwork URL, falling back to [`PLACEHOLDER_ARTWORK_URL`]
    pub artwork_url: String,
}

impl Episode {
    /// Creates an episode with all fields at their degraded defaults
    pub fn new() -> Self {
        Self {
            title: String::new(),
            description_html: String::new(),
            published_at: None,
            duration_label: None,
            media_url: String::new(),
            artwork_url: PLACEHOLDER_ARTWORK_URL.to_string(),
        }
    }

    /// Returns true if this episode points at a playable asset
    pub fn is_playable(&self) -> bool {
        !self.media_url.is_empty()
    }
}

impl Default for Episode {
    fn default() -> Self {
        Self::new()
    }
}
