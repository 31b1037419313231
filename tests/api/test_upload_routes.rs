// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use serde_json::json;

use super::common::{app_with, ScriptedGenerator};

#[tokio::test]
async fn test_upload_text_then_chat_cites_it() {
    let generator = ScriptedGenerator::replying("The launch is in May.");
    let app = app_with(Some(generator.clone()));

    let (status, body) = app
        .upload("plan.txt", b"The product launch is scheduled for May.\n\nBudget: tight.")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "File uploaded and processed successfully");
    assert_eq!(body["chunks"], 1);

    let (_, health) = app.get("/health").await;
    assert_eq!(health["documents"], 1);
    assert_eq!(health["chunks"], 1);

    let (status, _) = app
        .post_json("/api/rag/chat", json!({"question": "When is the launch?"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(generator.last_prompt().contains(
        "[Source: plan.txt, Chunk 1]\nThe product launch is scheduled for May. Budget: tight."
    ));
}

#[tokio::test]
async fn test_upload_removes_temporary_file() {
    let app = app_with(Some(ScriptedGenerator::replying("ok")));

    let (status, _) = app.upload("notes.txt", b"temporary").await;
    assert_eq!(status, StatusCode::OK);

    let upload_dir = app.dir.path().join("uploads");
    let leftover = std::fs::read_dir(&upload_dir).unwrap().count();
    assert_eq!(leftover, 0);
}

#[tokio::test]
async fn test_upload_rejects_unknown_extension() {
    let app = app_with(Some(ScriptedGenerator::replying("ok")));

    let (status, body) = app.upload("diagram.png", b"\x89PNG").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Only PDF, TXT, and DOCX files are supported");
    assert!(!app.dir.path().join("uploads").exists());
    assert!(app.state.documents.is_empty().await);
}

#[tokio::test]
async fn test_upload_docx_is_unsupported_and_store_unchanged() {
    let app = app_with(Some(ScriptedGenerator::replying("ok")));
    app.upload("first.txt", b"Existing content.").await;

    let (status, body) = app.upload("Report.DOCX", b"PK\x03\x04").await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["errorType"], "unsupported_format");
    assert_eq!(
        body["message"],
        "DOCX support coming soon. Please use PDF or TXT files."
    );
    assert_eq!(app.state.documents.len().await, 1);
}

#[tokio::test]
async fn test_upload_invalid_pdf_is_extraction_error() {
    let app = app_with(Some(ScriptedGenerator::replying("ok")));

    let (status, body) = app.upload("broken.pdf", b"%PDF-1.4 truncated").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"]["stage"], "extraction");
    assert!(app.state.documents.is_empty().await);
}

#[tokio::test]
async fn test_upload_empty_text_file() {
    let app = app_with(Some(ScriptedGenerator::replying("ok")));

    let (status, body) = app.upload("blank.txt", b"  \n ").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("No text content found in the file"));
}

#[tokio::test]
async fn test_ask_rag_returns_cited_sources() {
    let generator = ScriptedGenerator::replying("Blue [S1].");
    let app = app_with(Some(generator.clone()));
    app.upload("sky.txt", b"The sky is blue.").await;
    app.upload("grass.txt", b"Grass is green.").await;

    let (status, body) = app
        .post_json("/api/ask-rag", json!({"prompt": "The sky is blue.", "k": 1}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "Blue [S1].");
    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["label"], "S1");
    assert_eq!(sources[0]["id"], "sky.txt_chunk_0");
    assert_eq!(sources[0]["score"], 1.0);
    assert_eq!(sources[0]["metadata"]["source"], "sky.txt");
    assert_eq!(sources[0]["snippet"], "The sky is blue.");
    assert!(generator
        .last_prompt()
        .contains("Source 1 (id=sky.txt_chunk_0):\nThe sky is blue."));
}
