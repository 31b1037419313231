// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::config::AppConfig;

/// Grounded chat backend
#[derive(Parser, Debug, Default)]
#[command(name = "grounded-chat")]
#[command(version)]
#[command(about = "HTTP backend for Gemini chat with retrieval-augmented answers", long_about = None)]
pub struct Cli {
    /// TOML config file (applied before environment variables)
    #[arg(long, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Path of the persisted fixed document
    #[arg(long)]
    pub fixed_doc_path: Option<PathBuf>,

    /// Directory for uploads in flight
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,

    /// Run without GEMINI_API_KEY: local hash embeddings, generation disabled
    #[arg(long)]
    pub offline: bool,
}

impl Cli {
    /// Resolve the full configuration: defaults, file, environment, flags
    pub fn load_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        self.apply(&mut config);

        config
            .validate()
            .map_err(|e| anyhow!("Invalid configuration: {}", e))?;
        Ok(config)
    }

    /// Flags win over every other layer
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(path) = &self.fixed_doc_path {
            config.fixed_doc_path = path.clone();
        }
        if let Some(dir) = &self.upload_dir {
            config.upload_dir = dir.clone();
        }
        if self.offline {
            config.offline = true;
        }
    }
}
