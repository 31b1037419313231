// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Overlapping fixed-size text windows
//!
//! Sizes and offsets are counted in chars, so a window never splits a
//! multi-byte code point.

use super::errors::RagError;

/// Default window size in characters
pub const DEFAULT_CHUNK_SIZE: usize = 800;
/// Default overlap between consecutive windows in characters
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;

/// Window parameters for [`chunk_text`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    pub size: usize,
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkerConfig {
    pub fn new(size: usize, overlap: usize) -> Result<Self, RagError> {
        let config = Self { size, overlap };
        config.validate()?;
        Ok(config)
    }

    /// The window must advance by at least one char per step
    pub fn validate(&self) -> Result<(), RagError> {
        if self.size == 0 || self.overlap >= self.size {
            return Err(RagError::InvalidChunkConfig {
                size: self.size,
                overlap: self.overlap,
            });
        }
        Ok(())
    }

    pub fn chunk(&self, text: &str) -> Result<Vec<String>, RagError> {
        chunk_text(text, self.size, self.overlap)
    }
}

/// Collapse every whitespace run to a single space and trim both ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split `text` into windows of `size` chars, each starting `overlap` chars
/// before the previous window's end.
///
/// The text is normalized first. Every window except possibly the last is
/// exactly `size` chars long, and the last window always ends at the end of
/// the text.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>, RagError> {
    ChunkerConfig { size, overlap }.validate()?;

    let clean = normalize_whitespace(text);
    // Byte offset of every char boundary, including the end of the string
    let bounds: Vec<usize> = clean
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(clean.len()))
        .collect();
    let len = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + size).min(len);
        chunks.push(clean[bounds[start]..bounds[end]].to_string());
        if end == len {
            break;
        }
        start = end.saturating_sub(overlap);
    }

    Ok(chunks)
}
