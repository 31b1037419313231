// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Hosted language-model generation
//!
//! The model is an opaque remote call: a prompt goes in, text comes out.

pub mod gemini;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::{GeminiGenerator, GeminiGeneratorConfig};

/// Errors from a generation provider
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Request(String),

    #[error("generation API error: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("generation request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Provider answered without any text (blocked prompt, empty candidate list)
    #[error("generation returned no text: {0}")]
    EmptyResponse(String),

    #[error("malformed generation response: {0}")]
    Malformed(String),
}

impl GenerationError {
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Request(_) | GenerationError::Timeout { .. } => true,
            GenerationError::Status { status, .. } => *status == 429 || *status >= 500,
            GenerationError::EmptyResponse(_) | GenerationError::Malformed(_) => false,
        }
    }
}

/// Produces a completion for a single-turn prompt
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}
