//! Character-window text chunking.
//!
//! Splits extracted document text into overlapping fixed-size windows. The
//! overlap repeats the tail of each chunk at the head of the next so that
//! sentences straddling a boundary stay retrievable. Splitting is purely a
//! function of (text, size, overlap), so re-indexing a document always
//! reproduces the same chunk sequence.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChunkingError {
    #[error("Invalid chunking config: overlap {overlap} must be smaller than size {size}")]
    InvalidOverlap { size: usize, overlap: usize },

    #[error("Invalid chunking config: size must be non-zero")]
    ZeroSize,
}

/// Split `text` into chunks of at most `size` characters, each chunk after
/// the first repeating the previous chunk's trailing `overlap` characters.
///
/// The final chunk may be shorter than `size`; trailing content is never
/// dropped. Empty input yields an empty sequence.
pub fn split(text: &str, size: usize, overlap: usize) -> Result<Vec<String>, ChunkingError> {
    if size == 0 {
        return Err(ChunkingError::ZeroSize);
    }
    if overlap >= size {
        return Err(ChunkingError::InvalidOverlap { size, overlap });
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Ok(Vec::new());
    }

    let step = size - overlap;
    let mut chunks = Vec::with_capacity(chars.len().div_ceil(step));
    let mut start = 0;

    loop {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(chunks)
}
