// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Plain-text extraction for uploaded files

use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

use super::errors::RagError;

/// Declared type of an uploaded file, from its extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
    /// Accepted at upload, not yet extractable
    Docx,
    Other(String),
}

impl FileKind {
    /// Classify by extension, with or without the leading dot, any case
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => FileKind::Pdf,
            "txt" => FileKind::Text,
            "docx" => FileKind::Docx,
            _ => FileKind::Other(format!(".{}", ext)),
        }
    }

    /// Classify by the extension of a file name
    pub fn from_file_name(name: &str) -> Self {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        Self::from_extension(ext)
    }

    /// Whether uploads of this kind are accepted at all
    pub fn is_accepted(&self) -> bool {
        !matches!(self, FileKind::Other(_))
    }

    pub fn extension(&self) -> &str {
        match self {
            FileKind::Pdf => ".pdf",
            FileKind::Text => ".txt",
            FileKind::Docx => ".docx",
            FileKind::Other(ext) => ext,
        }
    }
}

/// Turns a file on disk into raw text
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, path: &Path, kind: &FileKind) -> Result<String, RagError>;
}

/// PDF via `pdf-extract`, plain text via UTF-8 read
#[derive(Debug, Clone, Default)]
pub struct DefaultExtractor;

#[async_trait]
impl TextExtractor for DefaultExtractor {
    async fn extract(&self, path: &Path, kind: &FileKind) -> Result<String, RagError> {
        match kind {
            FileKind::Pdf => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| RagError::Extraction(format!("failed to read PDF: {}", e)))?;
                debug!("Extracting text from PDF ({} bytes)", bytes.len());
                tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                    .await
                    .map_err(|e| RagError::Extraction(format!("PDF extraction task failed: {}", e)))?
                    .map_err(|e| RagError::Extraction(format!("failed to parse PDF: {}", e)))
            }
            FileKind::Text => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| RagError::Extraction(format!("failed to read file: {}", e)))?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            FileKind::Docx => Err(RagError::UnsupportedFormat(
                "DOCX support coming soon. Please use PDF or TXT files.".to_string(),
            )),
            FileKind::Other(ext) => Err(RagError::UnsupportedFormat(format!(
                "Unsupported file type: {}",
                ext
            ))),
        }
    }
}
