// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// RAG (Retrieval-Augmented Generation) module
// In-memory chunk storage, ingestion pipelines and grounded prompting

pub mod chunker;
pub mod errors;
pub mod extract;
pub mod fixed_document;
pub mod ingest;
pub mod prompt;
pub mod retriever;
pub mod vector_store;

pub use chunker::{chunk_text, normalize_whitespace, ChunkerConfig};
pub use errors::{RagError, Stage};
pub use extract::{DefaultExtractor, FileKind, TextExtractor};
pub use fixed_document::{FixedDocumentStore, FIXED_DOCUMENT_SOURCE, SEED_DOCUMENT};
pub use ingest::{build_records, DocumentIngestor, IngestReport};
pub use retriever::{
    CitationStyle, Retriever, NO_FIXED_DOCUMENT_CONTEXT, NO_UPLOAD_CONTEXT,
};
pub use vector_store::{cosine_similarity, ChunkRecord, SearchHit, SharedVectorStore, VectorStore};
