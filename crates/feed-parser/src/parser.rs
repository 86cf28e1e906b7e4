// crates/feed-parser/src/parser.rs
//! Feed normalization logic
//!
//! Turns RSS `<item>` and Atom `<entry>` elements into [`Episode`] records in
//! document order. Field extraction runs a fallback chain per field and the
//! first non-empty candidate wins; items are never dropped, so a feed with N
//! items always normalizes to exactly N episodes.

use crate::episode::{Episode, FeedFormat};
use crate::error::{ParseError, ParseResult};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Feed parser
pub struct FeedParser;

impl FeedParser {
    /// Parses a feed document in the declared format
    pub fn parse(content: &str, format: FeedFormat) -> ParseResult<Vec<Episode>> {
        match format {
            FeedFormat::Rss => Self::parse_rss(content),
            FeedFormat::Atom => Self::parse_atom(content),
        }
    }

    /// Detects the feed format from content
    pub fn detect(content: &str) -> Option<FeedFormat> {
        if content.contains("<rss") {
            Some(FeedFormat::Rss)
        } else if content.contains("<feed") && content.contains("http://www.w3.org/2005/Atom") {
            Some(FeedFormat::Atom)
        } else {
            None
        }
    }

    /// Parses an RSS 2.0 feed
    fn parse_rss(content: &str) -> ParseResult<Vec<Episode>> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut episodes = Vec::new();
        let mut current: Option<Episode> = None;
        let mut artwork = ArtworkScratch::default();
        let mut text_buffer = String::new();
        let mut in_item = false;
        let mut saw_markup = false;

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    saw_markup = true;
                    let element_name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                    if element_name == "item" {
                        in_item = true;
                        current = Some(Episode::new());
                        artwork = ArtworkScratch::default();
                    } else if in_item {
                        Self::collect_item_attrs(&e, current.as_mut(), &mut artwork);
                    }
                }
                Ok(Event::Empty(e)) => {
                    // Self-closing tags like <enclosure ... /> and <itunes:image ... />
                    saw_markup = true;
                    let element_name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                    if element_name == "item" {
                        // degenerate <item/> still counts as one episode
                        episodes.push(Episode::new());
                    } else if in_item {
                        Self::collect_item_attrs(&e, current.as_mut(), &mut artwork);
                    }
                }
                Ok(Event::Text(e)) => {
                    text_buffer = e.unescape().map(|s| s.to_string()).unwrap_or_default();
                }
                Ok(Event::CData(e)) => {
                    // HTML descriptions commonly arrive as CDATA; passed through verbatim
                    text_buffer = String::from_utf8_lossy(&e.into_inner()).to_string();
                }
                Ok(Event::End(e)) => {
                    let element_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    let (prefix, local) = split_name(&element_name);

                    if in_item {
                        if let Some(episode) = current.as_mut() {
                            match (prefix, local) {
                                (None, "title") => episode.title = text_buffer.clone(),
                                (None, "description") => {
                                    episode.description_html = text_buffer.clone()
                                }
                                (None, "pubDate") => {
                                    episode.published_at = parse_date(&text_buffer);
                                }
                                (Some(_), "duration") if !text_buffer.is_empty() => {
                                    episode.duration_label = Some(text_buffer.clone());
                                }
                                _ => {}
                            }
                        }

                        if element_name == "item" {
                            if let Some(mut episode) = current.take() {
                                artwork.take().apply(&mut episode);
                                episodes.push(episode);
                            }
                            in_item = false;
                        }
                    }

                    text_buffer.clear();
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(ParseError::from(e)),
                _ => {}
            }
            buf.clear();
        }

        if !saw_markup {
            return Err(ParseError::MalformedXml(
                "document contains no XML elements".to_string(),
            ));
        }

        Ok(episodes)
    }

    /// Parses an Atom feed
    fn parse_atom(content: &str) -> ParseResult<Vec<Episode>> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut episodes = Vec::new();
        let mut current: Option<Episode> = None;
        let mut artwork = ArtworkScratch::default();
        // media:description outranks summary/content regardless of document order
        let mut media_description: Option<String> = None;
        let mut plain_description: Option<String> = None;
        let mut saw_published = false;
        let mut text_buffer = String::new();
        let mut in_entry = false;
        let mut saw_markup = false;

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    saw_markup = true;
                    let element_name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                    if element_name == "entry" {
                        in_entry = true;
                        current = Some(Episode::new());
                        artwork = ArtworkScratch::default();
                        media_description = None;
                        plain_description = None;
                        saw_published = false;
                    } else if in_entry {
                        Self::collect_entry_attrs(&e, current.as_mut(), &mut artwork);
                    }
                }
                Ok(Event::Empty(e)) => {
                    saw_markup = true;
                    let element_name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                    if element_name == "entry" {
                        episodes.push(Episode::new());
                    } else if in_entry {
                        Self::collect_entry_attrs(&e, current.as_mut(), &mut artwork);
                    }
                }
                Ok(Event::Text(e)) => {
                    text_buffer = e.unescape().map(|s| s.to_string()).unwrap_or_default();
                }
                Ok(Event::CData(e)) => {
                    text_buffer = String::from_utf8_lossy(&e.into_inner()).to_string();
                }
                Ok(Event::End(e)) => {
                    let element_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    let (prefix, local) = split_name(&element_name);

                    if in_entry {
                        if let Some(episode) = current.as_mut() {
                            match (prefix, local) {
                                (None, "title") => episode.title = text_buffer.clone(),
                                (Some(_), "description") => {
                                    if media_description.is_none() && !text_buffer.is_empty() {
                                        media_description = Some(text_buffer.clone());
                                    }
                                }
                                (None, "summary") | (None, "content") => {
                                    if plain_description.is_none() && !text_buffer.is_empty() {
                                        plain_description = Some(text_buffer.clone());
                                    }
                                }
                                (None, "published") => {
                                    saw_published = true;
                                    episode.published_at = parse_date(&text_buffer);
                                }
                                (None, "updated") if !saw_published => {
                                    episode.published_at = parse_date(&text_buffer);
                                }
                                (Some(_), "duration") if !text_buffer.is_empty() => {
                                    episode.duration_label = Some(text_buffer.clone());
                                }
                                _ => {}
                            }
                        }

                        if element_name == "entry" {
                            if let Some(mut episode) = current.take() {
                                episode.description_html = media_description
                                    .take()
                                    .or_else(|| plain_description.take())
                                    .unwrap_or_default();
                                artwork.take().apply(&mut episode);
                                episodes.push(episode);
                            }
                            in_entry = false;
                        }
                    }

                    text_buffer.clear();
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(ParseError::from(e)),
                _ => {}
            }
            buf.clear();
        }

        if !saw_markup {
            return Err(ParseError::MalformedXml(
                "document contains no XML elements".to_string(),
            ));
        }

        Ok(episodes)
    }

    /// Extracts attribute-borne RSS item fields: enclosure URL and artwork candidates
    fn collect_item_attrs(
        e: &BytesStart,
        episode: Option<&mut Episode>,
        artwork: &mut ArtworkScratch,
    ) {
        let element_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
        let (prefix, local) = split_name(&element_name);

        match (prefix, local) {
            (None, "enclosure") => {
                if let (Some(episode), Some(url)) = (episode, attr_value(e, "url")) {
                    episode.media_url = url;
                }
            }
            _ => artwork.offer(prefix, local, e),
        }
    }

    /// Extracts attribute-borne Atom entry fields: alternate link and artwork candidates
    fn collect_entry_attrs(
        e: &BytesStart,
        episode: Option<&mut Episode>,
        artwork: &mut ArtworkScratch,
    ) {
        let element_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
        let (prefix, local) = split_name(&element_name);

        match (prefix, local) {
            (None, "link") => {
                if let Some(episode) = episode {
                    if episode.media_url.is_empty() && is_alternate_link(e) {
                        if let Some(href) = attr_value(e, "href") {
                            episode.media_url = href;
                        }
                    }
                }
            }
            _ => artwork.offer(prefix, local, e),
        }
    }
}

/// Artwork candidates gathered while scanning one item, ranked at item end.
///
/// The itunes image wins over media elements; the media thumbnail wins over
/// media content because in video feeds `content` is the asset, not an image.
#[derive(Debug, Default)]
struct ArtworkScratch {
    namespaced_image: Option<String>,
    media_thumbnail: Option<String>,
    media_content: Option<String>,
}

impl ArtworkScratch {
    /// Records an artwork candidate from a namespaced element, first seen per tier wins
    fn offer(&mut self, prefix: Option<&str>, local: &str, e: &BytesStart) {
        if prefix.is_none() {
            return;
        }
        match local {
            "image" if self.namespaced_image.is_none() => {
                self.namespaced_image = attr_value(e, "href");
            }
            "thumbnail" if self.media_thumbnail.is_none() => {
                self.media_thumbnail = attr_value(e, "url");
            }
            "content" if self.media_content.is_none() => {
                self.media_content = attr_value(e, "url");
            }
            _ => {}
        }
    }

    fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Writes the best candidate into the episode, keeping the placeholder otherwise
    fn apply(self, episode: &mut Episode) {
        let best = self
            .namespaced_image
            .or(self.media_thumbnail)
            .or(self.media_content);
        if let Some(url) = best {
            if !url.is_empty() {
                episode.artwork_url = url;
            }
        }
    }
}

/// Splits a qualified element name into prefix and local parts
fn split_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

/// Reads a single attribute value as an owned string
fn attr_value(e: &BytesStart, wanted: &str) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == wanted.as_bytes() {
            return Some(String::from_utf8_lossy(&attr.value).to_string());
        }
    }
    None
}

/// Returns true for links with rel="alternate" or no rel at all (Atom default)
fn is_alternate_link(e: &BytesStart) -> bool {
    match attr_value(e, "rel") {
        Some(rel) => rel == "alternate",
        None => true,
    }
}

/// Parses RFC 2822 (RSS pubDate) then RFC 3339 (Atom published) timestamps
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::episode::PLACEHOLDER_ARTWORK_URL;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_detect_rss() {
        let rss = r#"<?xml version="1.0"?><rss version="2.0"><channel></channel></rss>"#;
        assert_eq!(FeedParser::detect(rss), Some(FeedFormat::Rss));
    }

    #[test]
    fn test_detect_atom() {
        let atom = r#"<?xml version="1.0"?><feed xmlns="http://www.w3.org/2005/Atom"></feed>"#;
        assert_eq!(FeedParser::detect(atom), Some(FeedFormat::Atom));
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(FeedParser::detect("<html></html>"), None);
    }

    #[test]
    fn test_parse_rss_round_trip() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>Test Feed</title>
    <item>
      <title>Episode 1</title>
      <description>First episode</description>
      <pubDate>Tue, 10 Jun 2025 04:00:00 GMT</pubDate>
      <itunes:duration>01:23:45</itunes:duration>
      <enclosure url="http://example.com/ep1.mp3" type="audio/mpeg" length="1000"/>
    </item>
  </channel>
</rss>"#;

        let episodes = FeedParser::parse(rss, FeedFormat::Rss).expect("Should parse RSS");
        assert_eq!(episodes.len(), 1);
        let ep = &episodes[0];
        assert_eq!(ep.title, "Episode 1");
        assert_eq!(ep.description_html, "First episode");
        assert_eq!(ep.media_url, "http://example.com/ep1.mp3");
        assert_eq!(ep.duration_label.as_deref(), Some("01:23:45"));

        let date = ep.published_at.expect("Should parse pubDate");
        assert_eq!((date.year(), date.month(), date.day()), (2025, 6, 10));
        assert_eq!(date.hour(), 4);
    }

    #[test]
    fn test_artwork_itunes_image_wins() {
        let rss = r#"<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <item>
      <title>Art</title>
      <itunes:image href="http://example.com/itunes.jpg"/>
      <media:content url="http://example.com/media.jpg"/>
    </item>
  </channel>
</rss>"#;

        let episodes = FeedParser::parse(rss, FeedFormat::Rss).expect("Should parse");
        assert_eq!(episodes[0].artwork_url, "http://example.com/itunes.jpg");
    }

    #[test]
    fn test_artwork_falls_back_to_media_content() {
        let rss = r#"<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <item>
      <title>Art</title>
      <media:content url="http://example.com/media.jpg"/>
    </item>
  </channel>
</rss>"#;

        let episodes = FeedParser::parse(rss, FeedFormat::Rss).expect("Should parse");
        assert_eq!(episodes[0].artwork_url, "http://example.com/media.jpg");
    }

    #[test]
    fn test_artwork_falls_back_to_placeholder() {
        let rss = r#"<rss version="2.0"><channel><item><title>No art</title></item></channel></rss>"#;

        let episodes = FeedParser::parse(rss, FeedFormat::Rss).expect("Should parse");
        assert_eq!(episodes[0].artwork_url, PLACEHOLDER_ARTWORK_URL);
    }

    #[test]
    fn test_unparseable_date_degrades_without_affecting_siblings() {
        let rss = r#"<rss version="2.0">
  <channel>
    <item>
      <title>Bad date</title>
      <pubDate>sometime last week</pubDate>
    </item>
    <item>
      <title>Good date</title>
      <pubDate>Mon, 02 Jun 2025 12:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

        let episodes = FeedParser::parse(rss, FeedFormat::Rss).expect("Should parse");
        assert_eq!(episodes.len(), 2);
        assert!(episodes[0].published_at.is_none());
        assert!(episodes[1].published_at.is_some());
    }

    #[test]
    fn test_item_count_is_preserved() {
        let rss = r#"<rss version="2.0">
  <channel>
    <title>Feed</title>
    <item><title>One</title></item>
    <item/>
    <item><enclosure url="http://example.com/three.mp3"/></item>
  </channel>
</rss>"#;

        let episodes = FeedParser::parse(rss, FeedFormat::Rss).expect("Should parse");
        assert_eq!(episodes.len(), 3);
        // the self-closing item is emitted with degraded fields, not dropped
        assert!(episodes[1].title.is_empty());
        assert!(!episodes[1].is_playable());
        assert_eq!(episodes[2].media_url, "http://example.com/three.mp3");
    }

    #[test]
    fn test_empty_feed_yields_empty_list() {
        let rss = r#"<rss version="2.0"><channel><title>Empty</title></channel></rss>"#;
        let episodes = FeedParser::parse(rss, FeedFormat::Rss).expect("Should parse");
        assert!(episodes.is_empty());
    }

    #[test]
    fn test_malformed_document_fails() {
        let result = FeedParser::parse("not xml at all", FeedFormat::Rss);
        assert!(matches!(result, Err(ParseError::MalformedXml(_))));

        let truncated = r#"<rss version="2.0"><channel><item><title>Oops</channel>"#;
        assert!(FeedParser::parse(truncated, FeedFormat::Rss).is_err());
    }

    #[test]
    fn test_cdata_description_passes_through_verbatim() {
        let rss = r#"<rss version="2.0">
  <channel>
    <item>
      <title>HTML</title>
      <description><![CDATA[<p>Hello <b>world</b></p>]]></description>
    </item>
  </channel>
</rss>"#;

        let episodes = FeedParser::parse(rss, FeedFormat::Rss).expect("Should parse");
        assert_eq!(episodes[0].description_html, "<p>Hello <b>world</b></p>");
    }

    #[test]
    fn test_parse_atom_entry() {
        let atom = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:media="http://search.yahoo.com/mrss/">
  <title>Channel</title>
  <entry>
    <title>Video 1</title>
    <link rel="alternate" href="http://example.com/watch?v=abc"/>
    <published>2025-06-10T04:00:00+00:00</published>
    <media:group>
      <media:content url="http://example.com/v/abc" type="application/x-shockwave-flash"/>
      <media:thumbnail url="http://example.com/thumb.jpg"/>
      <media:description>A video description</media:description>
    </media:group>
  </entry>
</feed>"#;

        let episodes = FeedParser::parse(atom, FeedFormat::Atom).expect("Should parse Atom");
        assert_eq!(episodes.len(), 1);
        let ep = &episodes[0];
        assert_eq!(ep.title, "Video 1");
        assert_eq!(ep.media_url, "http://example.com/watch?v=abc");
        assert_eq!(ep.description_html, "A video description");
        assert_eq!(ep.artwork_url, "http://example.com/thumb.jpg");
        assert!(ep.published_at.is_some());
    }

    #[test]
    fn test_atom_self_link_is_not_media_url() {
        let atom = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title>Entry</title>
    <link rel="self" href="http://example.com/feed"/>
    <link rel="alternate" href="http://example.com/page"/>
  </entry>
</feed>"#;

        let episodes = FeedParser::parse(atom, FeedFormat::Atom).expect("Should parse");
        assert_eq!(episodes[0].media_url, "http://example.com/page");
    }

    #[test]
    fn test_atom_summary_is_description_fallback() {
        let atom = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title>Entry</title>
    <summary>Plain summary</summary>
  </entry>
</feed>"#;

        let episodes = FeedParser::parse(atom, FeedFormat::Atom).expect("Should parse");
        assert_eq!(episodes[0].description_html, "Plain summary");
    }

    #[test]
    fn test_channel_metadata_does_not_leak_into_items() {
        let rss = r#"<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>Channel Title</title>
    <description>Channel description</description>
    <itunes:image href="http://example.com/channel.jpg"/>
    <item><title>Only Item</title></item>
  </channel>
</rss>"#;

        let episodes = FeedParser::parse(rss, FeedFormat::Rss).expect("Should parse");
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].title, "Only Item");
        assert!(episodes[0].description_html.is_empty());
        assert_eq!(episodes[0].artwork_url, PLACEHOLDER_ARTWORK_URL);
    }
}
