// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Parser;
use grounded_chat::{
    cli::Cli,
    embeddings::{Embedder, GeminiEmbedder, HashEmbedder},
    inference::{GeminiGenerator, Generator},
    start_server, AppState,
};
use std::{env, sync::Arc};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    let (embedder, generator): (Arc<dyn Embedder>, Option<Arc<dyn Generator>>) =
        match config.api_key() {
            Some(key) if !config.offline => {
                let embedder: Arc<dyn Embedder> = Arc::new(
                    GeminiEmbedder::new(config.embedder_config(key))
                        .map_err(|e| anyhow!("Failed to create embedder: {}", e))?,
                );
                let generator: Arc<dyn Generator> = Arc::new(
                    GeminiGenerator::new(config.generator_config(key))
                        .map_err(|e| anyhow!("Failed to create generator: {}", e))?,
                );
                info!(
                    "Using Gemini models {} (embeddings) and {} (chat)",
                    config.embed_model, config.chat_model
                );
                (embedder, Some(generator))
            }
            _ => {
                warn!(
                    "Offline mode: {}-dimensional hash embeddings, generation routes disabled",
                    config.offline_embed_dim
                );
                let embedder: Arc<dyn Embedder> =
                    Arc::new(HashEmbedder::new(config.offline_embed_dim));
                (embedder, None)
            }
        };

    info!(
        "Chunking {}/{} chars, top-{} retrieval, fixed document at {}",
        config.chunk_size,
        config.chunk_overlap,
        config.retrieval_top_k,
        config.fixed_doc_path.display()
    );

    let state = AppState::new(config, embedder, generator);
    start_server(state).await
}
