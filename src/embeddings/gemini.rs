// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Gemini embedding provider
//!
//! Talks to the Generative Language REST API (`embedContent` and
//! `batchEmbedContents`). Batches are split at `batch_size`, every request is
//! bounded by the client timeout, and transient failures are retried.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{validate_embedding, Embedder, EmbeddingError};
use crate::config::GEMINI_API_BASE;
use crate::utils::RetryPolicy;

/// Connection settings for [`GeminiEmbedder`]
#[derive(Debug, Clone)]
pub struct GeminiEmbedderConfig {
    pub api_key: String,
    pub base_url: String,
    /// Model name, with or without the `models/` prefix
    pub model: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Maximum texts per `batchEmbedContents` call
    pub batch_size: usize,
}

impl GeminiEmbedderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: GEMINI_API_BASE.to_string(),
            model: "text-embedding-004".to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            batch_size: 100,
        }
    }
}

/// Remote embedder backed by the Gemini API
pub struct GeminiEmbedder {
    client: Client,
    config: GeminiEmbedderConfig,
    model_path: String,
}

impl GeminiEmbedder {
    pub fn new(config: GeminiEmbedderConfig) -> Result<Self, EmbeddingError> {
        if config.api_key.trim().is_empty() {
            return Err(EmbeddingError::Request("missing Gemini API key".to_string()));
        }
        if config.batch_size == 0 {
            return Err(EmbeddingError::Request(
                "batch size must be greater than 0".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EmbeddingError::Request(format!("failed to build HTTP client: {}", e)))?;

        let model_path = model_path(&config.model);
        Ok(Self {
            client,
            config,
            model_path,
        })
    }

    pub fn model(&self) -> &str {
        &self.model_path
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            self.model_path,
            method
        )
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R, EmbeddingError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let timeout_ms = self.config.timeout.as_millis() as u64;
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", self.config.api_key.trim())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout { timeout_ms }
                } else {
                    EmbeddingError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| EmbeddingError::Malformed(format!("JSON parse error: {}", e)))
    }

    async fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest::new(&self.model_path, text))
                .collect(),
        };
        let url = self.endpoint("batchEmbedContents");

        let response: BatchEmbedResponse = self
            .config
            .retry
            .run("Gemini batchEmbedContents", EmbeddingError::is_retryable, || {
                self.post_json(&url, &request)
            })
            .await?;

        vectors_from_batch(response, texts.len())
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbedContentRequest::new(&self.model_path, text);
        let url = self.endpoint("embedContent");

        let response: EmbedContentResponse = self
            .config
            .retry
            .run("Gemini embedContent", EmbeddingError::is_retryable, || {
                self.post_json(&url, &request)
            })
            .await?;

        let values = response
            .embedding
            .ok_or_else(|| EmbeddingError::Malformed("response has no embedding".to_string()))?
            .values;
        validate_embedding(&values)?;
        Ok(values)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size) {
            debug!("Embedding batch of {} texts with {}", batch.len(), self.model_path);
            let vectors = self.embed_chunk(batch).await?;
            // Batches are checked individually; keep the dimension across them too
            if let (Some(first), Some(next)) = (embeddings.first(), vectors.first()) {
                if first.len() != next.len() {
                    return Err(EmbeddingError::Malformed(format!(
                        "inconsistent embedding dimensions across batches: {} and {}",
                        first.len(),
                        next.len()
                    )));
                }
            }
            embeddings.extend(vectors);
        }
        Ok(embeddings)
    }
}

fn model_path(model: &str) -> String {
    let name = model.trim().trim_start_matches("models/");
    format!("models/{}", name)
}

/// Check a batch response against the request and flatten it into vectors
fn vectors_from_batch(
    response: BatchEmbedResponse,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if response.embeddings.len() != expected {
        return Err(EmbeddingError::Malformed(format!(
            "provider returned {} embeddings for {} inputs",
            response.embeddings.len(),
            expected
        )));
    }

    let vectors: Vec<Vec<f32>> = response.embeddings.into_iter().map(|e| e.values).collect();
    for values in &vectors {
        validate_embedding(values)?;
    }
    if let Some(first) = vectors.first() {
        if let Some(bad) = vectors.iter().find(|v| v.len() != first.len()) {
            return Err(EmbeddingError::Malformed(format!(
                "inconsistent embedding dimensions in batch: {} and {}",
                first.len(),
                bad.len()
            )));
        }
    }
    Ok(vectors)
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

impl<'a> EmbedContentRequest<'a> {
    fn new(model: &'a str, text: &'a str) -> Self {
        Self {
            model,
            content: Content {
                parts: vec![Part { text }],
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: Option<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}
