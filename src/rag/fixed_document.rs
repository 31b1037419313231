// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Single editable document with its own vector index
//!
//! The raw text is persisted to one file; the index is rebuilt from it on
//! `init` and replaced wholesale on `update`. A rebuild happens off to the
//! side and is published only once every chunk is embedded and the file is
//! written, so a failure at any step leaves content, index and file as they
//! were.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

use super::chunker::ChunkerConfig;
use super::errors::RagError;
use super::ingest::{build_records, BuiltDocument, RecordLabels};
use super::vector_store::{SharedVectorStore, VectorStore};
use crate::embeddings::Embedder;

/// Source label of every fixed-document chunk
pub const FIXED_DOCUMENT_SOURCE: &str = "Fixed Document";

const ID_PREFIX: &str = "fixed_doc";

/// Written to disk the first time `init` runs without a document
pub const SEED_DOCUMENT: &str = "Sample Document Content

This is a sample document that will be used for the RAG chat system.
You can edit this content through the frontend interface.

Section 1: Introduction
This document contains various topics and information that users can ask questions about.

Section 2: Technology
The system uses advanced AI and vector embeddings to provide intelligent responses.

Section 3: Features
- PDF text extraction
- Vector embeddings
- Semantic search
- AI-powered responses
- Content editing capabilities

Section 4: Usage
Users can ask questions about this document and receive accurate answers based on the content.

Section 5: Benefits
- No need to upload files repeatedly
- Consistent document reference
- Easy content updates
- Efficient information retrieval

This document serves as a foundation for the RAG chat system and can be modified as needed.";

#[derive(Debug, Default)]
struct DocumentState {
    content: String,
    ready: bool,
}

pub struct FixedDocumentStore {
    path: PathBuf,
    embedder: Arc<dyn Embedder>,
    chunker: ChunkerConfig,
    index: SharedVectorStore,
    state: RwLock<DocumentState>,
    // Held by init/update for their whole run
    writer: Mutex<()>,
}

impl FixedDocumentStore {
    pub fn new(path: impl Into<PathBuf>, embedder: Arc<dyn Embedder>, chunker: ChunkerConfig) -> Self {
        Self {
            path: path.into(),
            embedder,
            chunker,
            index: SharedVectorStore::new(),
            state: RwLock::new(DocumentState::default()),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Index handle for retrieval
    pub fn index(&self) -> &SharedVectorStore {
        &self.index
    }

    pub async fn is_ready(&self) -> bool {
        self.state.read().await.ready
    }

    /// Current raw content; empty before the first init or update
    pub async fn content(&self) -> String {
        self.state.read().await.content.clone()
    }

    /// Load the persisted document, seeding it if missing, and rebuild the
    /// index from it. Returns the number of chunks.
    pub async fn init(&self) -> Result<usize, RagError> {
        let _writer = self.writer.lock().await;

        if !tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| RagError::persistence(&self.path, e))?
        {
            persist(&self.path, SEED_DOCUMENT).await?;
            info!("Created sample document at {}", self.path.display());
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| RagError::persistence(&self.path, e))?;
        if content.trim().is_empty() {
            return Err(RagError::EmptyContent);
        }

        let (characters, index) = self.build(&content).await.map_err(|e| {
            error!("Failed to initialize fixed document: {}", e);
            e
        })?;
        let chunks = index.len();
        info!(
            "Fixed document: {} characters, created {} chunks",
            characters, chunks
        );

        self.publish(content, index).await;
        Ok(chunks)
    }

    /// Replace the document. Returns the number of chunks.
    pub async fn update(&self, content: &str) -> Result<usize, RagError> {
        if content.trim().is_empty() {
            return Err(RagError::EmptyContent);
        }

        let _writer = self.writer.lock().await;

        let (_, index) = self.build(content).await.map_err(|e| {
            error!("Failed to update fixed document: {}", e);
            e
        })?;
        let chunks = index.len();

        persist(&self.path, content).await?;
        self.publish(content.to_string(), index).await;
        info!("Updated fixed document with {} chunks", chunks);
        Ok(chunks)
    }

    /// Embed `content` into a complete, validated index. Returns the cleaned
    /// length in chars alongside it.
    async fn build(&self, content: &str) -> Result<(usize, VectorStore), RagError> {
        let labels = RecordLabels {
            source: FIXED_DOCUMENT_SOURCE,
            id_prefix: ID_PREFIX,
            paged: true,
        };
        let BuiltDocument {
            characters,
            records,
        } = build_records(self.embedder.as_ref(), &self.chunker, content, labels).await?;
        Ok((characters, VectorStore::from_records(records)?))
    }

    async fn publish(&self, content: String, index: VectorStore) {
        // Swap content and index under the state lock so readers see both or neither
        let mut state = self.state.write().await;
        self.index.publish(index).await;
        state.content = content;
        state.ready = true;
    }
}

/// Write `content` next to `path` and rename it into place
async fn persist(path: &Path, content: &str) -> Result<(), RagError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| RagError::persistence(dir, e))?;
    }

    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    tokio::fs::write(&staging, content)
        .await
        .map_err(|e| RagError::persistence(&staging, e))?;
    tokio::fs::rename(&staging, path)
        .await
        .map_err(|e| RagError::persistence(path, e))
}
