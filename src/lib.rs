// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod embeddings;
pub mod inference;
pub mod rag;
pub mod utils;

pub use api::{create_app, start_server, AppState};
pub use config::AppConfig;
pub use embeddings::{Embedder, GeminiEmbedder, HashEmbedder};
pub use inference::{GeminiGenerator, Generator};
pub use rag::{FixedDocumentStore, RagError, Retriever, SharedVectorStore, VectorStore};
