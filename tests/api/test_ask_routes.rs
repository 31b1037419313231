// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use grounded_chat::rag::NO_UPLOAD_CONTEXT;
use serde_json::json;

use super::common::{app_with, ScriptedGenerator};

#[tokio::test]
async fn test_root_and_health() {
    let app = app_with(Some(ScriptedGenerator::replying("ok")));

    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("Backend running successfully!"));

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["documents"], 0);
    assert_eq!(body["chunks"], 0);
    assert_eq!(body["fixedDocumentReady"], false);
}

#[tokio::test]
async fn test_ask_strips_markdown() {
    let generator = ScriptedGenerator::replying("  **Paris** is the *capital*.  ");
    let app = app_with(Some(generator.clone()));

    for uri in ["/ask", "/api/ai"] {
        let (status, body) = app
            .post_json(uri, json!({"prompt": "Capital of France?"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "Paris is the capital.");
    }
    assert_eq!(generator.last_prompt(), "Capital of France?");
}

#[tokio::test]
async fn test_ask_requires_prompt() {
    let generator = ScriptedGenerator::replying("unused");
    let app = app_with(Some(generator.clone()));

    let (status, body) = app.post_json("/ask", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Prompt is required");
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_chat_on_empty_store_returns_200() {
    let generator = ScriptedGenerator::replying("I have no documents to work from.");
    let app = app_with(Some(generator.clone()));

    let (status, body) = app
        .post_json("/api/rag/chat", json!({"question": "What does the report say?"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "I have no documents to work from.");
    let prompt = generator.last_prompt();
    assert!(prompt.contains(NO_UPLOAD_CONTEXT));
    assert!(prompt.contains("USER QUESTION: What does the report say?"));
}

#[tokio::test]
async fn test_chat_answer_is_cleaned() {
    let generator = ScriptedGenerator::replying(
        "Revenue grew (Chunk 2; chunk 3) per 0123456789abcdef0123456789abcdef.",
    );
    let app = app_with(Some(generator));

    let (status, body) = app
        .post_json("/api/rag/chat", json!({"question": "Revenue?"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "Revenue grew ( ) per .");
}

#[tokio::test]
async fn test_ask_rag_without_sources() {
    let generator = ScriptedGenerator::replying("I couldn't find that in the provided **knowledge**.");
    let app = app_with(Some(generator.clone()));

    let (status, body) = app
        .post_json("/api/ask-rag", json!({"prompt": "Who wrote it?"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "I couldn't find that in the provided knowledge.");
    assert_eq!(body["sources"], json!([]));
    assert!(generator.last_prompt().contains("(no sources found)"));
}

#[tokio::test]
async fn test_generation_failure_is_bad_gateway() {
    let app = app_with(Some(ScriptedGenerator::failing(400)));

    let (status, body) = app.post_json("/ask", json!({"prompt": "hello"})).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["errorType"], "generation_failure");
    assert_eq!(body["details"]["stage"], "generation");
}

#[tokio::test]
async fn test_offline_mode_disables_generation_only() {
    let app = app_with(None);

    let (status, body) = app.post_json("/ask", json!({"prompt": "hello"})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["errorType"], "service_unavailable");

    let (status, _) = app
        .post_json("/api/ragchat/chat", json!({"question": "anything"}))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = app.post_json("/api/ragchat/init", json!({})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_json_uses_error_shape() {
    let generator = ScriptedGenerator::replying("unused");
    let app = app_with(Some(generator.clone()));

    let (status, body) = app
        .post_raw("/api/rag/chat", "application/json", r#"{"question": "#)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "invalid_request");
    assert!(!body["message"].as_str().unwrap().is_empty());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_negative_k_is_invalid_request() {
    let generator = ScriptedGenerator::replying("unused");
    let app = app_with(Some(generator.clone()));

    let (status, body) = app
        .post_json("/api/ask-rag", json!({"prompt": "anything", "k": -1}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "invalid_request");
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_missing_json_content_type_is_invalid_request() {
    let app = app_with(Some(ScriptedGenerator::replying("unused")));

    let (status, body) = app
        .post_raw("/ask", "text/plain", r#"{"prompt": "hello"}"#)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "invalid_request");
}
