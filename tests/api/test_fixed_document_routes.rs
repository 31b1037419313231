// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use grounded_chat::rag::{NO_FIXED_DOCUMENT_CONTEXT, SEED_DOCUMENT};
use serde_json::json;

use super::common::{app_with, ScriptedGenerator};

#[tokio::test]
async fn test_content_is_empty_before_init() {
    let app = app_with(Some(ScriptedGenerator::replying("ok")));

    let (status, body) = app.get("/api/ragchat/content").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["content"], "");
}

#[tokio::test]
async fn test_chat_before_init_uses_sentinel() {
    let generator = ScriptedGenerator::replying("Please initialize the document first.");
    let app = app_with(Some(generator.clone()));

    let (status, _) = app
        .post_json("/api/ragchat/chat", json!({"question": "What is this?"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(generator.last_prompt().contains(NO_FIXED_DOCUMENT_CONTEXT));
}

#[tokio::test]
async fn test_init_seeds_and_persists_document() {
    let app = app_with(Some(ScriptedGenerator::replying("ok")));

    let (status, body) = app.post_json("/api/ragchat/init", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = app.get("/api/ragchat/content").await;
    assert_eq!(body["content"], SEED_DOCUMENT);

    let persisted = app.dir.path().join("data").join("sample_document.txt");
    assert_eq!(std::fs::read_to_string(persisted).unwrap(), SEED_DOCUMENT);

    let (_, health) = app.get("/health").await;
    assert_eq!(health["fixedDocumentReady"], true);
    assert_eq!(health["chunks"], 0);
}

#[tokio::test]
async fn test_update_then_chat_cites_pages() {
    let generator = ScriptedGenerator::replying("The warranty lasts two years.");
    let app = app_with(Some(generator.clone()));

    let (status, body) = app
        .post_json(
            "/api/ragchat/update",
            json!({"content": "Warranty: two years from purchase."}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = app.get("/api/ragchat/content").await;
    assert_eq!(body["content"], "Warranty: two years from purchase.");

    let (status, body) = app
        .post_json("/api/ragchat/chat", json!({"question": "How long is the warranty?"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "The warranty lasts two years.");

    let prompt = generator.last_prompt();
    assert!(prompt.contains("[Page 1, Section 1]\nWarranty: two years from purchase."));
    assert!(prompt.contains("Provide page numbers or section references if available"));
}

#[tokio::test]
async fn test_update_rejects_missing_and_blank_content() {
    let app = app_with(Some(ScriptedGenerator::replying("ok")));
    app.post_json("/api/ragchat/init", json!({})).await;

    let (status, body) = app.post_json("/api/ragchat/update", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Content is required");

    let (status, body) = app
        .post_json("/api/ragchat/update", json!({"content": "   \n"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "content");

    let (_, body) = app.get("/api/ragchat/content").await;
    assert_eq!(body["content"], SEED_DOCUMENT);
}

#[tokio::test]
async fn test_repeated_update_is_idempotent() {
    let app = app_with(Some(ScriptedGenerator::replying("ok")));
    let content = "Policy text. ".repeat(200);

    let (_, first) = app
        .post_json("/api/ragchat/update", json!({"content": content}))
        .await;
    let chunks_once = app.state.fixed_document.index().len().await;
    let (_, second) = app
        .post_json("/api/ragchat/update", json!({"content": content}))
        .await;

    assert_eq!(first, second);
    assert_eq!(app.state.fixed_document.index().len().await, chunks_once);
    assert_eq!(app.state.fixed_document.content().await, content);
}
