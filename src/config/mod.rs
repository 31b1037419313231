// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration
//!
//! Built in layers: defaults, then an optional TOML file, then environment
//! variables, then command-line flags (see [`crate::cli::Cli`]).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::embeddings::GeminiEmbedderConfig;
use crate::inference::GeminiGeneratorConfig;
use crate::rag::ChunkerConfig;
use crate::utils::RetryPolicy;

/// Root of the Generative Language REST API
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Required unless `offline` is set
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub embed_model: String,
    pub chat_model: String,
    /// Where the fixed document's raw text is persisted
    pub fixed_doc_path: PathBuf,
    /// Scratch directory for uploads in flight
    pub upload_dir: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Chunks placed in a chat prompt
    pub retrieval_top_k: usize,
    /// `k` for ask-rag when the request omits it
    pub ask_rag_default_k: usize,
    pub request_timeout_secs: u64,
    pub max_retries: usize,
    pub embed_batch_size: usize,
    /// Vector size of the hash embedder used offline
    pub offline_embed_dim: usize,
    /// Run without the remote API: hash embeddings, no generation
    pub offline: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            gemini_api_key: None,
            gemini_base_url: GEMINI_API_BASE.to_string(),
            embed_model: "text-embedding-004".to_string(),
            chat_model: "gemini-2.5-flash".to_string(),
            fixed_doc_path: PathBuf::from("./data/sample_document.txt"),
            upload_dir: PathBuf::from("uploads"),
            chunk_size: 800,
            chunk_overlap: 150,
            retrieval_top_k: 5,
            ask_rag_default_k: 4,
            request_timeout_secs: 30,
            max_retries: 3,
            embed_batch_size: 100,
            offline_embed_dim: 768,
            offline: false,
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl AppConfig {
    /// Load from a TOML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Override fields from environment-style variables. Unparseable numbers
    /// are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(port) = parse_var(&lookup, "PORT") {
            self.port = port;
        }
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.gemini_api_key = Some(key);
        }
        if let Some(url) = lookup("GEMINI_BASE_URL") {
            self.gemini_base_url = url;
        }
        if let Some(model) = lookup("GEMINI_EMBED_MODEL") {
            self.embed_model = model;
        }
        if let Some(model) = lookup("GEMINI_CHAT_MODEL") {
            self.chat_model = model;
        }
        if let Some(path) = lookup("FIXED_DOC_PATH") {
            self.fixed_doc_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(dir);
        }
        if let Some(v) = parse_var(&lookup, "CHUNK_SIZE") {
            self.chunk_size = v;
        }
        if let Some(v) = parse_var(&lookup, "CHUNK_OVERLAP") {
            self.chunk_overlap = v;
        }
        if let Some(v) = parse_var(&lookup, "RETRIEVAL_TOP_K") {
            self.retrieval_top_k = v;
        }
        if let Some(v) = parse_var(&lookup, "ASK_RAG_DEFAULT_K") {
            self.ask_rag_default_k = v;
        }
        if let Some(v) = parse_var(&lookup, "REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "MAX_RETRIES") {
            self.max_retries = v;
        }
        if let Some(v) = parse_var(&lookup, "EMBED_BATCH_SIZE") {
            self.embed_batch_size = v;
        }
        if let Some(v) = parse_var(&lookup, "OFFLINE_EMBED_DIM") {
            self.offline_embed_dim = v;
        }
        if let Some(v) = lookup("OFFLINE") {
            self.offline = matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// API key if one is set and non-blank
    pub fn api_key(&self) -> Option<&str> {
        self.gemini_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn chunker(&self) -> ChunkerConfig {
        ChunkerConfig {
            size: self.chunk_size,
            overlap: self.chunk_overlap,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_attempts(self.max_retries)
    }

    pub fn embedder_config(&self, api_key: &str) -> GeminiEmbedderConfig {
        GeminiEmbedderConfig {
            api_key: api_key.to_string(),
            base_url: self.gemini_base_url.clone(),
            model: self.embed_model.clone(),
            timeout: self.request_timeout(),
            retry: self.retry_policy(),
            batch_size: self.embed_batch_size,
        }
    }

    pub fn generator_config(&self, api_key: &str) -> GeminiGeneratorConfig {
        GeminiGeneratorConfig {
            api_key: api_key.to_string(),
            base_url: self.gemini_base_url.clone(),
            model: self.chat_model.clone(),
            timeout: self.request_timeout(),
            retry: self.retry_policy(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.chunker().validate().map_err(|e| e.to_string())?;

        if self.retrieval_top_k == 0 {
            return Err("RETRIEVAL_TOP_K must be greater than 0".to_string());
        }
        if self.ask_rag_default_k == 0 {
            return Err("ASK_RAG_DEFAULT_K must be greater than 0".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("REQUEST_TIMEOUT_SECS must be greater than 0".to_string());
        }
        if self.max_retries == 0 {
            return Err("MAX_RETRIES must be at least 1".to_string());
        }
        if self.embed_batch_size == 0 {
            return Err("EMBED_BATCH_SIZE must be greater than 0".to_string());
        }
        if self.offline {
            if self.offline_embed_dim == 0 {
                return Err("OFFLINE_EMBED_DIM must be greater than 0".to_string());
            }
        } else if self.api_key().is_none() {
            return Err(
                "GEMINI_API_KEY is not set (pass --offline to run without the remote API)"
                    .to_string(),
            );
        }
        Ok(())
    }
}
