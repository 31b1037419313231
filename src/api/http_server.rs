// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{DefaultBodyLimit, Json, State},
    routing::{get, post},
    Router,
};
use axum_extra::extract::Multipart;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

use super::handlers::{
    AnswerResponse, ApiJson, AskRagRequest, AskRagResponse, ContentResponse,
    HealthResponse, PromptRequest, QuestionRequest, StatusResponse, UpdateContentRequest,
    UploadResponse,
};
use super::ApiError;
use crate::config::AppConfig;
use crate::embeddings::Embedder;
use crate::inference::Generator;
use crate::rag::prompt::{
    ask_rag_prompt, cite_sources, clean_chat_answer, grounded_chat_prompt,
    strip_markdown_emphasis,
};
use crate::rag::{
    DefaultExtractor, DocumentIngestor, FileKind, FixedDocumentStore, Retriever,
    SharedVectorStore, TextExtractor,
};

/// Largest accepted request body (uploads included)
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Everything a handler can reach
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Uploaded documents, append-only
    pub documents: SharedVectorStore,
    pub ingestor: DocumentIngestor,
    pub fixed_document: Arc<FixedDocumentStore>,
    pub upload_retriever: Arc<Retriever>,
    pub fixed_retriever: Arc<Retriever>,
    /// `None` in offline mode
    pub generator: Option<Arc<dyn Generator>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        embedder: Arc<dyn Embedder>,
        generator: Option<Arc<dyn Generator>>,
    ) -> Self {
        Self::with_extractor(config, embedder, generator, Arc::new(DefaultExtractor))
    }

    pub fn with_extractor(
        config: AppConfig,
        embedder: Arc<dyn Embedder>,
        generator: Option<Arc<dyn Generator>>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        let documents = SharedVectorStore::new();
        let chunker = config.chunker();
        let ingestor =
            DocumentIngestor::new(embedder.clone(), extractor, chunker, documents.clone());
        let fixed_document = Arc::new(FixedDocumentStore::new(
            config.fixed_doc_path.clone(),
            embedder.clone(),
            chunker,
        ));
        let upload_retriever = Arc::new(Retriever::for_uploads(
            embedder.clone(),
            config.retrieval_top_k,
        ));
        let fixed_retriever = Arc::new(Retriever::for_fixed_document(
            embedder,
            config.retrieval_top_k,
        ));

        Self {
            config: Arc::new(config),
            documents,
            ingestor,
            fixed_document,
            upload_retriever,
            fixed_retriever,
            generator,
        }
    }

    fn generator(&self) -> Result<&Arc<dyn Generator>, ApiError> {
        self.generator.as_ref().ok_or_else(|| {
            ApiError::ServiceUnavailable(
                "Text generation is disabled (server running in offline mode)".to_string(),
            )
        })
    }
}

/// Build the router with all routes, CORS and request tracing
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/ask", post(ask_handler))
        .route("/api/ai", post(ask_handler))
        .route("/api/ask-rag", post(ask_rag_handler))
        .route("/api/rag/upload", post(upload_handler))
        .route("/api/rag/chat", post(rag_chat_handler))
        .route("/api/ragchat/init", post(fixed_init_handler))
        .route("/api/ragchat/content", get(fixed_content_handler))
        .route("/api/ragchat/update", post(fixed_update_handler))
        .route("/api/ragchat/chat", post(fixed_chat_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl+C
pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.bind_address();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
        })
        .await?;

    Ok(())
}

fn require<'a>(value: &'a str, field: &str, message: &str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::missing_field(field, message));
    }
    Ok(trimmed)
}

async fn root_handler() -> &'static str {
    "Backend running successfully!"
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.documents.snapshot().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        documents: snapshot.sources().len(),
        chunks: snapshot.len(),
        fixed_document_ready: state.fixed_document.is_ready().await,
    })
}

async fn ask_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PromptRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let prompt = require(&request.prompt, "prompt", "Prompt is required")?;
    let generator = state.generator()?;

    let answer = generator.generate(prompt).await?;
    Ok(Json(AnswerResponse {
        answer: strip_markdown_emphasis(&answer),
    }))
}

async fn ask_rag_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AskRagRequest>,
) -> Result<Json<AskRagResponse>, ApiError> {
    let prompt = require(&request.prompt, "prompt", "Prompt is required")?;
    let generator = state.generator()?;
    let k = request.k.unwrap_or(state.config.ask_rag_default_k);

    let hits = state
        .upload_retriever
        .retrieve_hits(&state.documents, prompt, k)
        .await?;
    debug!("ask-rag: {} sources for k={}", hits.len(), k);

    let answer = generator.generate(&ask_rag_prompt(prompt, &hits)).await?;
    Ok(Json(AskRagResponse {
        answer: strip_markdown_emphasis(&answer),
        sources: cite_sources(&hits),
    }))
}

/// Keep only the final path component of a client-supplied file name
fn display_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("upload")
        .to_string()
}

async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload: Option<(String, axum::body::Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = display_name(field.file_name().unwrap_or_default());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to read upload: {}", e)))?;
        upload = Some((name, bytes));
        break;
    }

    let (name, bytes) =
        upload.ok_or_else(|| ApiError::missing_field("file", "No file uploaded"))?;
    let kind = FileKind::from_file_name(&name);
    if !kind.is_accepted() {
        warn!("Rejected upload {} ({})", name, kind.extension());
        return Err(ApiError::InvalidRequest(
            "Only PDF, TXT, and DOCX files are supported".to_string(),
        ));
    }

    let path = stage_upload(&state.config.upload_dir, kind.extension(), &bytes).await?;
    let result = state.ingestor.ingest_file(&path, &kind, &name).await;
    if let Err(e) = tokio::fs::remove_file(&path).await {
        warn!("Failed to remove temporary upload {}: {}", path.display(), e);
    }

    let report = result?;
    Ok(Json(UploadResponse {
        success: true,
        message: "File uploaded and processed successfully".to_string(),
        chunks: report.chunks,
    }))
}

/// Write upload bytes to a uniquely named file in `dir`
async fn stage_upload(dir: &Path, extension: &str, bytes: &[u8]) -> Result<PathBuf, ApiError> {
    let internal = |e: std::io::Error| ApiError::InternalError {
        stage: Some(crate::rag::Stage::Storage),
        message: format!("Failed to store upload: {}", e),
    };

    tokio::fs::create_dir_all(dir).await.map_err(internal)?;
    let path = dir.join(format!("{}{}", uuid::Uuid::new_v4(), extension));
    tokio::fs::write(&path, bytes).await.map_err(internal)?;
    Ok(path)
}

async fn rag_chat_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<QuestionRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let question = require(&request.question, "question", "Question required")?;
    let generator = state.generator()?;

    let context = state
        .upload_retriever
        .retrieve_context(&state.documents, question)
        .await?;
    let answer = generator
        .generate(&grounded_chat_prompt(&context, question, false))
        .await?;

    Ok(Json(AnswerResponse {
        answer: clean_chat_answer(&answer),
    }))
}

async fn fixed_init_handler(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    let chunks = state.fixed_document.init().await?;
    Ok(Json(StatusResponse {
        success: true,
        message: format!("Fixed document initialized successfully ({} chunks)", chunks),
    }))
}

async fn fixed_content_handler(State(state): State<AppState>) -> Json<ContentResponse> {
    Json(ContentResponse {
        success: true,
        content: state.fixed_document.content().await,
    })
}

async fn fixed_update_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UpdateContentRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    if request.content.is_empty() {
        return Err(ApiError::missing_field("content", "Content is required"));
    }

    let chunks = state.fixed_document.update(&request.content).await?;
    Ok(Json(StatusResponse {
        success: true,
        message: format!("Document content updated successfully ({} chunks)", chunks),
    }))
}

async fn fixed_chat_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<QuestionRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let question = require(&request.question, "question", "Question required")?;
    let generator = state.generator()?;

    let context = state
        .fixed_retriever
        .retrieve_context(state.fixed_document.index(), question)
        .await?;
    let answer = generator
        .generate(&grounded_chat_prompt(&context, question, true))
        .await?;

    Ok(Json(AnswerResponse {
        answer: clean_chat_answer(&answer),
    }))
}
