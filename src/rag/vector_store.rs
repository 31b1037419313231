// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// In-memory chunk storage for RAG
// Records live for the lifetime of the process; nothing here touches disk

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::errors::RagError;

/// One embedded chunk of a source document
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkRecord {
    pub id: String,
    pub text: String,
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub source: String,
    pub chunk_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// Result from vector search
#[derive(Clone, Debug)]
pub struct SearchHit {
    pub record: ChunkRecord,
    pub score: f32,
}

/// Cosine similarity of two equal-length vectors
///
/// A zero-magnitude side scores 0.0 instead of NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        0.0
    } else {
        dot / (magnitude_a * magnitude_b)
    }
}

/// Linear-scan vector store
/// - Append-only between clears
/// - Dimension fixed by the first record
/// - Search is O(N·D); fine for a handful of documents, not for a corpus
#[derive(Clone, Debug, Default)]
pub struct VectorStore {
    records: Vec<ChunkRecord>,
    dimension: Option<usize>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from records, validating all of them first
    pub fn from_records(records: Vec<ChunkRecord>) -> Result<Self, RagError> {
        let mut store = Self::new();
        store.extend(records)?;
        Ok(store)
    }

    fn check_vector(vector: &[f32], dimension: Option<usize>) -> Result<(), RagError> {
        if vector.is_empty() {
            return Err(RagError::InvalidVector("vector is empty".to_string()));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(RagError::InvalidVector(
                "contains NaN or Infinity (all values must be finite numbers)".to_string(),
            ));
        }
        if let Some(expected) = dimension {
            if vector.len() != expected {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }
        Ok(())
    }

    /// Add a record. Ids are not checked for uniqueness.
    pub fn append(&mut self, record: ChunkRecord) -> Result<(), RagError> {
        Self::check_vector(&record.embedding, self.dimension)?;
        self.dimension.get_or_insert(record.embedding.len());
        self.records.push(record);
        Ok(())
    }

    /// Add many records; on error nothing is added
    pub fn extend(&mut self, records: Vec<ChunkRecord>) -> Result<(), RagError> {
        let expected = self
            .dimension
            .or_else(|| records.first().map(|r| r.embedding.len()));
        for record in &records {
            Self::check_vector(&record.embedding, expected)?;
        }

        self.dimension = expected;
        self.records.extend(records);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.dimension = None;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Embedding dimension, once the first record is in
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn records(&self) -> &[ChunkRecord] {
        &self.records
    }

    /// Distinct source labels in insertion order
    pub fn sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = Vec::new();
        for record in &self.records {
            if !sources.contains(&record.source.as_str()) {
                sources.push(&record.source);
            }
        }
        sources
    }

    /// Top-k records by cosine similarity to `query`
    ///
    /// # Returns
    /// * At most `min(top_k, len)` hits, sorted by score descending; equal
    ///   scores keep insertion order
    /// * `Err` if the query dimension does not match the stored vectors
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>, RagError> {
        // Empty store returns empty results
        if self.records.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        Self::check_vector(query, self.dimension)?;

        let mut scored: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| (i, cosine_similarity(query, &record.embedding)))
            .collect();

        // sort_by is stable, so ties stay in insertion order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| SearchHit {
                record: self.records[i].clone(),
                score,
            })
            .collect())
    }
}

/// Cloneable handle to a process-wide store
///
/// Readers take an immutable snapshot and never see a half-built store;
/// writers either append a whole document at once or publish a complete
/// replacement.
#[derive(Clone, Debug, Default)]
pub struct SharedVectorStore {
    inner: Arc<RwLock<Arc<VectorStore>>>,
}

impl SharedVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Arc<VectorStore> {
        self.inner.read().await.clone()
    }

    /// Append all records or none
    pub async fn append_all(&self, records: Vec<ChunkRecord>) -> Result<(), RagError> {
        let mut guard = self.inner.write().await;
        Arc::make_mut(&mut *guard).extend(records)
    }

    /// Replace the whole store in one step
    pub async fn publish(&self, store: VectorStore) {
        *self.inner.write().await = Arc::new(store);
    }

    pub async fn clear(&self) {
        *self.inner.write().await = Arc::new(VectorStore::new());
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
