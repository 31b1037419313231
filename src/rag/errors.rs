// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for document ingestion and retrieval
//!
//! Every failure names the stage it happened in so callers can tell an
//! extraction problem from an embedding or generation outage.

use thiserror::Error;

use crate::embeddings::EmbeddingError;
use crate::inference::GenerationError;

/// Pipeline stage a [`RagError`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validation,
    Extraction,
    Embedding,
    Generation,
    Storage,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validation => "validation",
            Stage::Extraction => "extraction",
            Stage::Embedding => "embedding",
            Stage::Generation => "generation",
            Stage::Storage => "storage",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while ingesting, storing or retrieving chunks
#[derive(Error, Debug)]
pub enum RagError {
    /// File type is unknown or declared but not implemented
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Extractor failed or produced no text
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Remote embedding call failed or returned unusable vectors
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Remote language-model call failed
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Attempt to store or update blank content
    #[error("Content cannot be empty")]
    EmptyContent,

    /// Chunk window cannot advance
    #[error("Invalid chunk configuration: size {size}, overlap {overlap} (overlap must be smaller than size)")]
    InvalidChunkConfig { size: usize, overlap: usize },

    /// Vector length differs from the store's dimension
    #[error("Dimension mismatch: expected {expected}D, got {actual}D")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vector contains NaN or Infinity
    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    /// Persisted document could not be read or written
    #[error("Persistence failed for {path}: {source}")]
    Persistence {
        path: String,
        source: std::io::Error,
    },
}

impl RagError {
    pub fn persistence(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        RagError::Persistence {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Stage of the pipeline that failed
    pub fn stage(&self) -> Stage {
        match self {
            RagError::UnsupportedFormat(_) | RagError::Extraction(_) => Stage::Extraction,
            RagError::Embedding(_)
            | RagError::DimensionMismatch { .. }
            | RagError::InvalidVector(_) => Stage::Embedding,
            RagError::Generation(_) => Stage::Generation,
            RagError::EmptyContent | RagError::InvalidChunkConfig { .. } => Stage::Validation,
            RagError::Persistence { .. } => Stage::Storage,
        }
    }

    /// Get error code for logging and API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            RagError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            RagError::Extraction(_) => "EXTRACTION_FAILED",
            RagError::Embedding(_) => "EMBEDDING_FAILED",
            RagError::Generation(_) => "GENERATION_FAILED",
            RagError::EmptyContent => "EMPTY_CONTENT",
            RagError::InvalidChunkConfig { .. } => "INVALID_CHUNK_CONFIG",
            RagError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            RagError::InvalidVector(_) => "INVALID_VECTOR",
            RagError::Persistence { .. } => "PERSISTENCE_FAILED",
        }
    }

    /// Get user-friendly error message for API responses
    pub fn user_message(&self) -> String {
        match self {
            RagError::UnsupportedFormat(msg) => msg.clone(),
            RagError::Extraction(msg) => format!("Could not extract text: {}", msg),
            RagError::Embedding(EmbeddingError::Timeout { .. }) => {
                "Embedding service timed out".to_string()
            }
            RagError::Embedding(e) => format!("Embedding service error: {}", e),
            RagError::Generation(GenerationError::Timeout { .. }) => {
                "Language model timed out".to_string()
            }
            RagError::Generation(e) => format!("Language model error: {}", e),
            RagError::Persistence { .. } => "Failed to save document content".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether the failure came from an upstream deadline
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            RagError::Embedding(EmbeddingError::Timeout { .. })
                | RagError::Generation(GenerationError::Timeout { .. })
        )
    }
}
