//! Text extraction seam.
//!
//! Turning raw document bytes into plain text is an external collaborator;
//! the pipeline only depends on the [`TextExtractor`] trait. The shipped
//! implementation handles plain-text (UTF-8) uploads. Format-specific
//! extractors (PDF, HTML, ...) plug in behind the same trait.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Document is not valid UTF-8 text: {0}")]
    InvalidEncoding(#[from] std::string::FromUtf8Error),

    #[error("Unreadable document: {0}")]
    Unreadable(String),
}

pub trait TextExtractor: Send + Sync {
    /// Extract the full plain text of a document. Unreadable or corrupt
    /// input is an error, never an empty string.
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Strict UTF-8 extractor for plain-text uploads.
#[derive(Debug, Default, Clone)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}
