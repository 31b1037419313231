// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Query-time retrieval: embed, search, format
//!
//! A [`Retriever`] is bound to one citation style and one "nothing found"
//! message, so the upload store and the fixed-document store each get their
//! own instance over the same embedder.

use std::sync::Arc;
use tracing::debug;

use super::errors::RagError;
use super::vector_store::{SearchHit, SharedVectorStore};
use crate::embeddings::Embedder;

/// Returned when the uploaded-document store has nothing to offer
pub const NO_UPLOAD_CONTEXT: &str =
    "No relevant context found. Please make sure you have uploaded a document.";

/// Returned when the fixed document has not been initialized
pub const NO_FIXED_DOCUMENT_CONTEXT: &str =
    "No relevant context found. Please make sure the document has been initialized.";

/// Default number of chunks placed in a grounded prompt
pub const DEFAULT_TOP_K: usize = 5;

/// How each context block is labelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationStyle {
    /// `[Source: report.pdf, Chunk 2]`
    Source,
    /// `[Page 1, Section 2]`
    Page,
}

impl CitationStyle {
    pub fn cite(&self, hit: &SearchHit) -> String {
        let record = &hit.record;
        match self {
            CitationStyle::Source => format!(
                "[Source: {}, Chunk {}]",
                record.source,
                record.chunk_index + 1
            ),
            CitationStyle::Page => format!(
                "[Page {}, Section {}]",
                record.page.unwrap_or(1),
                record.chunk_index + 1
            ),
        }
    }
}

/// Join hits into a context window, best match first
pub fn format_context(hits: &[SearchHit], style: CitationStyle) -> String {
    hits.iter()
        .map(|hit| format!("{}\n{}", style.cite(hit), hit.record.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    top_k: usize,
    citation: CitationStyle,
    empty_message: String,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        top_k: usize,
        citation: CitationStyle,
        empty_message: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            top_k,
            citation,
            empty_message: empty_message.into(),
        }
    }

    /// Retriever over uploaded files
    pub fn for_uploads(embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self::new(embedder, top_k, CitationStyle::Source, NO_UPLOAD_CONTEXT)
    }

    /// Retriever over the fixed document
    pub fn for_fixed_document(embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self::new(embedder, top_k, CitationStyle::Page, NO_FIXED_DOCUMENT_CONTEXT)
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn empty_message(&self) -> &str {
        &self.empty_message
    }

    /// Top `k` hits for `query`; an empty store yields no hits and no
    /// embedding call
    pub async fn retrieve_hits(
        &self,
        store: &SharedVectorStore,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>, RagError> {
        let snapshot = store.snapshot().await;
        if snapshot.is_empty() || k == 0 {
            debug!("Retrieval skipped: store has {} chunks, k={}", snapshot.len(), k);
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let hits = snapshot.search(&query_embedding, k)?;
        debug!(
            "Retrieved {} of {} chunks (best score {:.4})",
            hits.len(),
            snapshot.len(),
            hits.first().map(|h| h.score).unwrap_or(0.0)
        );
        Ok(hits)
    }

    /// Citation-formatted context for a grounded prompt, or the configured
    /// sentinel when nothing matches
    pub async fn retrieve_context(
        &self,
        store: &SharedVectorStore,
        query: &str,
    ) -> Result<String, RagError> {
        let hits = self.retrieve_hits(store, query, self.top_k).await?;
        if hits.is_empty() {
            return Ok(self.empty_message.clone());
        }
        Ok(format_context(&hits, self.citation))
    }
}
