// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Gemini `generateContent` client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{GenerationError, Generator};
use crate::config::GEMINI_API_BASE;
use crate::utils::RetryPolicy;

#[derive(Debug, Clone)]
pub struct GeminiGeneratorConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl GeminiGeneratorConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: GEMINI_API_BASE.to_string(),
            model: "gemini-2.5-flash".to_string(),
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

/// Language model backed by the Gemini API
pub struct GeminiGenerator {
    client: Client,
    config: GeminiGeneratorConfig,
    url: String,
}

impl GeminiGenerator {
    pub fn new(config: GeminiGeneratorConfig) -> Result<Self, GenerationError> {
        if config.api_key.trim().is_empty() {
            return Err(GenerationError::Request("missing Gemini API key".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenerationError::Request(format!("failed to build HTTP client: {}", e)))?;

        let url = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model.trim().trim_start_matches("models/")
        );

        Ok(Self {
            client,
            config,
            url,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn generate_once(&self, request: &GenerateRequest<'_>) -> Result<String, GenerationError> {
        let timeout_ms = self.config.timeout.as_millis() as u64;
        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", self.config.api_key.trim())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout { timeout_ms }
                } else {
                    GenerationError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(GenerationError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let data: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(format!("JSON parse error: {}", e)))?;

        extract_text(data)
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!("Generating with {} ({} prompt chars)", self.config.model, prompt.len());
        let request = GenerateRequest::user(prompt);

        self.config
            .retry
            .run("Gemini generateContent", GenerationError::is_retryable, || {
                self.generate_once(&request)
            })
            .await
            .map_err(|e| {
                warn!("Gemini generation failed: {}", e);
                e
            })
    }
}

/// Concatenate the text parts of the first candidate
fn extract_text(data: GenerateResponse) -> Result<String, GenerationError> {
    let candidate = match data.candidates.into_iter().next() {
        Some(candidate) => candidate,
        None => {
            let reason = data
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(GenerationError::EmptyResponse(reason));
        }
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "empty candidate".to_string());
        return Err(GenerationError::EmptyResponse(reason));
    }

    Ok(text)
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

impl<'a> GenerateRequest<'a> {
    fn user(prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}
