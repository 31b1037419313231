// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::extract::FromRequest;
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::rag::prompt::CitedSource;

/// `Json` extractor whose rejections are reported as [`ApiError`]
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Body of `/ask` and `/api/ai`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskRagRequest {
    #[serde(default)]
    pub prompt: String,
    /// Number of sources to retrieve (defaults to the configured value)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<usize>,
}

/// Body of the chat routes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateContentRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskRagResponse {
    pub answer: String,
    pub sources: Vec<CitedSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentResponse {
    pub success: bool,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub chunks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    /// Distinct uploaded documents
    pub documents: usize,
    /// Chunks across uploaded documents
    pub chunks: usize,
    pub fixed_document_ready: bool,
}
