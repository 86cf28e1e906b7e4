// crates/feed-parser/src/error.rs
//! Error types for feed normalization

use thiserror::Error;

/// Result type for feed parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors that can occur while normalizing a feed document.
///
/// A broken individual item never produces an error; it degrades to empty
/// fields instead. Only a document that is not well-formed XML fails.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// The document is not well-formed XML
    #[error("Malformed XML: {0}")]
    MalformedXml(String),
}

impl From<quick_xml::Error> for ParseError {
    fn from(err: quick_xml::Error) -> Self {
        ParseError::MalformedXml(err.to_string())
    }
}
