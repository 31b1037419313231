// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text embedding providers
//!
//! Every chunk and every query goes through an [`Embedder`] before it can be
//! stored or searched. The remote Gemini client is the production provider;
//! [`HashEmbedder`] produces deterministic vectors without a network and backs
//! offline mode, tests and benchmarks.

pub mod gemini;

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use thiserror::Error;

pub use gemini::{GeminiEmbedder, GeminiEmbedderConfig};

/// Errors from an embedding provider
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Transport-level failure (DNS, connect, TLS, body read)
    #[error("embedding request failed: {0}")]
    Request(String),

    /// Provider answered with a non-success status
    #[error("embedding API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Provider did not answer within the request timeout
    #[error("embedding request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Provider answered, but not with usable vectors
    #[error("malformed embedding response: {0}")]
    Malformed(String),
}

impl EmbeddingError {
    /// Whether a retry has a chance of succeeding
    pub fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::Request(_) | EmbeddingError::Timeout { .. } => true,
            EmbeddingError::Status { status, .. } => *status == 429 || *status >= 500,
            EmbeddingError::Malformed(_) => false,
        }
    }
}

/// Converts text into a dense vector of provider-fixed dimension
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed many texts, preserving order
    ///
    /// The default implementation issues one call per text.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}

/// Check a provider vector before it enters a store
pub fn validate_embedding(values: &[f32]) -> Result<(), EmbeddingError> {
    if values.is_empty() {
        return Err(EmbeddingError::Malformed("empty embedding vector".to_string()));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(EmbeddingError::Malformed(
            "embedding contains NaN or Infinity".to_string(),
        ));
    }
    Ok(())
}

/// Deterministic pseudo-embeddings derived from a hash of the text
///
/// Identical texts map to identical vectors, so self-similarity is exactly
/// 1.0. There is no semantic signal beyond that.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
    normalize: bool,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            normalize: true,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut current_seed = hasher.finish();

        let mut embedding = Vec::with_capacity(self.dimension);
        for i in 0..self.dimension {
            // LCG step, mixed with the position
            current_seed =
                (current_seed.wrapping_mul(1664525).wrapping_add(1013904223)) ^ (i as u64);
            let value = (current_seed as f64 / u64::MAX as f64) * 2.0 - 1.0;
            embedding.push(value as f32);
        }

        if self.normalize {
            let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for value in &mut embedding {
                    *value /= norm;
                }
            }
        }

        embedding
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.generate(text))
    }
}
