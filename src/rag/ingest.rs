// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document ingestion: extract, clean, chunk, embed, store
//!
//! Every chunk of a document is embedded before any record reaches a store,
//! so a failed embedding call never leaves a half-ingested document behind.

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::chunker::{normalize_whitespace, ChunkerConfig};
use super::errors::RagError;
use super::extract::{FileKind, TextExtractor};
use super::vector_store::{ChunkRecord, SharedVectorStore};
use crate::embeddings::{Embedder, EmbeddingError};

/// Chunks per heuristic page of the fixed document
pub const CHUNKS_PER_PAGE: usize = 3;

/// How records of one document are labelled
#[derive(Debug, Clone)]
pub struct RecordLabels<'a> {
    /// Source label shown in citations
    pub source: &'a str,
    /// Ids become `{id_prefix}_chunk_{i}`
    pub id_prefix: &'a str,
    /// Assign heuristic page numbers
    pub paged: bool,
}

/// Records of one document, ready to append or publish
#[derive(Debug, Clone)]
pub struct BuiltDocument {
    /// Length of the cleaned text in chars
    pub characters: usize,
    pub records: Vec<ChunkRecord>,
}

/// Turn raw text into embedded records without touching any store
pub async fn build_records(
    embedder: &dyn Embedder,
    chunker: &ChunkerConfig,
    raw: &str,
    labels: RecordLabels<'_>,
) -> Result<BuiltDocument, RagError> {
    let clean = normalize_whitespace(raw);
    let characters = clean.chars().count();
    let chunks = chunker.chunk(&clean)?;

    let embeddings = embedder.embed_batch(&chunks).await?;
    if embeddings.len() != chunks.len() {
        return Err(EmbeddingError::Malformed(format!(
            "expected {} embeddings, got {}",
            chunks.len(),
            embeddings.len()
        ))
        .into());
    }

    let records = chunks
        .into_iter()
        .zip(embeddings)
        .enumerate()
        .map(|(i, (text, embedding))| ChunkRecord {
            id: format!("{}_chunk_{}", labels.id_prefix, i),
            text,
            embedding,
            source: labels.source.to_string(),
            chunk_index: i,
            page: labels.paged.then(|| (i / CHUNKS_PER_PAGE) as u32 + 1),
        })
        .collect();

    Ok(BuiltDocument {
        characters,
        records,
    })
}

/// Outcome of one successful ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub source: String,
    pub characters: usize,
    pub chunks: usize,
}

/// Appends uploaded documents to the shared store
#[derive(Clone)]
pub struct DocumentIngestor {
    embedder: Arc<dyn Embedder>,
    extractor: Arc<dyn TextExtractor>,
    chunker: ChunkerConfig,
    store: SharedVectorStore,
}

impl DocumentIngestor {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn TextExtractor>,
        chunker: ChunkerConfig,
        store: SharedVectorStore,
    ) -> Self {
        Self {
            embedder,
            extractor,
            chunker,
            store,
        }
    }

    pub fn store(&self) -> &SharedVectorStore {
        &self.store
    }

    /// Extract `path` as `kind` and append its chunks under the label `name`
    pub async fn ingest_file(
        &self,
        path: &Path,
        kind: &FileKind,
        name: &str,
    ) -> Result<IngestReport, RagError> {
        let raw = self.extractor.extract(path, kind).await.map_err(|e| {
            warn!("Failed to extract {}: {}", name, e);
            e
        })?;
        self.ingest_text(name, &raw).await
    }

    /// Chunk, embed and append already-extracted text
    pub async fn ingest_text(&self, name: &str, raw: &str) -> Result<IngestReport, RagError> {
        if raw.trim().is_empty() {
            return Err(RagError::Extraction(
                "No text content found in the file".to_string(),
            ));
        }

        let labels = RecordLabels {
            source: name,
            id_prefix: name,
            paged: false,
        };
        let built = build_records(self.embedder.as_ref(), &self.chunker, raw, labels).await?;
        let chunks = built.records.len();
        info!(
            "Extracted {} characters from {}, created {} chunks",
            built.characters, name, chunks
        );

        self.store.append_all(built.records).await?;
        info!("Ingested {} with {} chunks", name, chunks);

        Ok(IngestReport {
            source: name.to_string(),
            characters: built.characters,
            chunks,
        })
    }
}
