// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{error, warn};

use crate::rag::{RagError, Stage};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    InvalidRequest(String),
    ValidationError {
        field: String,
        message: String,
    },
    UnsupportedMediaType(String),
    Unprocessable {
        stage: Stage,
        message: String,
    },
    /// The remote model API failed
    Upstream {
        stage: Stage,
        message: String,
    },
    ServiceUnavailable(String),
    Timeout {
        stage: Stage,
        message: String,
    },
    InternalError {
        stage: Option<Stage>,
        message: String,
    },
}

fn stage_details(stage: Stage) -> HashMap<String, serde_json::Value> {
    let mut details = HashMap::new();
    details.insert(
        "stage".to_string(),
        serde_json::Value::String(stage.as_str().to_string()),
    );
    details
}

impl ApiError {
    pub fn missing_field(field: &str, message: &str) -> Self {
        ApiError::ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        let (error_type, message, details) = match self {
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None),
            ApiError::ValidationError { field, message } => {
                let mut details = stage_details(Stage::Validation);
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                ("validation_error", message.clone(), Some(details))
            }
            ApiError::UnsupportedMediaType(msg) => (
                "unsupported_format",
                msg.clone(),
                Some(stage_details(Stage::Extraction)),
            ),
            ApiError::Unprocessable { stage, message } => {
                ("extraction_error", message.clone(), Some(stage_details(*stage)))
            }
            ApiError::Upstream { stage, message } => {
                let error_type = match stage {
                    Stage::Embedding => "embedding_failure",
                    _ => "generation_failure",
                };
                (error_type, message.clone(), Some(stage_details(*stage)))
            }
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg.clone(), None),
            ApiError::Timeout { stage, message } => {
                ("timeout", message.clone(), Some(stage_details(*stage)))
            }
            ApiError::InternalError { stage, message } => {
                ("internal_error", message.clone(), stage.map(stage_details))
            }
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message,
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidRequest(_) | ApiError::ValidationError { .. } => 400,
            ApiError::UnsupportedMediaType(_) => 415,
            ApiError::Unprocessable { .. } => 422,
            ApiError::Upstream { .. } => 502,
            ApiError::ServiceUnavailable(_) => 503,
            ApiError::Timeout { .. } => 504,
            ApiError::InternalError { .. } => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::UnsupportedMediaType(msg) => write!(f, "Unsupported format: {}", msg),
            ApiError::Unprocessable { stage, message } => write!(f, "{} failed: {}", stage, message),
            ApiError::Upstream { stage, message } => {
                write!(f, "Upstream {} error: {}", stage, message)
            }
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::Timeout { stage, .. } => write!(f, "Request timed out during {}", stage),
            ApiError::InternalError { message, .. } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        let stage = err.stage();
        let message = err.user_message();

        if err.is_timeout() {
            return ApiError::Timeout { stage, message };
        }

        match err {
            RagError::UnsupportedFormat(msg) => ApiError::UnsupportedMediaType(msg),
            RagError::Extraction(_) => ApiError::Unprocessable { stage, message },
            RagError::EmptyContent => ApiError::ValidationError {
                field: "content".to_string(),
                message,
            },
            RagError::Embedding(_)
            | RagError::Generation(_)
            | RagError::DimensionMismatch { .. }
            | RagError::InvalidVector(_) => ApiError::Upstream { stage, message },
            RagError::InvalidChunkConfig { .. } | RagError::Persistence { .. } => {
                ApiError::InternalError {
                    stage: Some(stage),
                    message,
                }
            }
        }
    }
}

impl From<crate::inference::GenerationError> for ApiError {
    fn from(err: crate::inference::GenerationError) -> Self {
        RagError::from(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        (status, axum::Json(self.to_response())).into_response()
    }
}
