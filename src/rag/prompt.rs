// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Grounded prompt templates and model-output cleanup

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use super::vector_store::SearchHit;

/// Characters of chunk text shown in a source snippet
pub const SNIPPET_CHARS: usize = 300;

/// Placeholder used in the ask-rag prompt when retrieval found nothing
pub const NO_SOURCES: &str = "(no sources found)";

/// Prompt for the chat routes. `page_refs` adds the instruction to cite
/// page and section numbers, used for the fixed document.
pub fn grounded_chat_prompt(context: &str, question: &str, page_refs: bool) -> String {
    let page_line = if page_refs {
        "\n- Provide page numbers or section references if available"
    } else {
        ""
    };

    format!(
        "You are a helpful AI assistant that answers questions based on the provided document context. \n\
         \n\
         IMPORTANT INSTRUCTIONS:\n\
         - Only use the information provided in the context below to answer the question\n\
         - If the context doesn't contain enough information to answer the question, say so clearly\n\
         - Be concise but thorough in your responses\n\
         - If you're unsure about something, acknowledge the limitation\n\
         - Always cite which parts of the document you're referencing when possible{page_line}\n\
         \n\
         CONTEXT FROM DOCUMENT:\n\
         {context}\n\
         \n\
         USER QUESTION: {question}\n\
         \n\
         Please provide a helpful answer based on the context above:"
    )
}

/// Prompt for ask-rag; sources are numbered S1..Sn in hit order
pub fn ask_rag_prompt(query: &str, hits: &[SearchHit]) -> String {
    let blocks = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| format!("Source {} (id={}):\n{}", i + 1, hit.record.id, hit.record.text))
        .collect::<Vec<_>>()
        .join("\n\n");
    let sources = if blocks.is_empty() {
        NO_SOURCES
    } else {
        blocks.as_str()
    };

    format!(
        "\nYou are a helpful assistant. Use ONLY the provided sources to answer.\n\
         If the answer isn't in the sources, say \"I couldn't find that in the provided knowledge.\"\n\
         \n\
         ### SOURCES\n\
         {sources}\n\
         \n\
         ### QUESTION\n\
         {query}\n\
         \n\
         ### INSTRUCTIONS\n\
         - Be concise and factual.\n\
         - Cite sources inline like [S1], [S2] using the numbering above when you use them.\n"
    )
}

/// Remove markdown bold/italic asterisks and trim
pub fn strip_markdown_emphasis(answer: &str) -> String {
    answer.replace('*', "").trim().to_string()
}

fn chunk_reference() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Chunk \d+;?").expect("chunk reference pattern is valid"))
}

fn hex_identifier() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)[a-f0-9]{32}").expect("hex id pattern is valid"))
}

/// Strip internal chunk references and 32-char hex ids the model may echo
pub fn clean_chat_answer(answer: &str) -> String {
    let without_chunks = chunk_reference().replace_all(answer, "");
    hex_identifier().replace_all(&without_chunks, "").into_owned()
}

/// Metadata attached to each ask-rag source
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetadata {
    pub source: String,
    pub chunk_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// One cited source returned next to an ask-rag answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitedSource {
    pub label: String,
    pub id: String,
    pub score: f64,
    pub metadata: SourceMetadata,
    pub snippet: String,
}

/// First [`SNIPPET_CHARS`] chars, with `...` when cut
pub fn snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn round4(score: f32) -> f64 {
    (score as f64 * 10_000.0).round() / 10_000.0
}

pub fn cite_sources(hits: &[SearchHit]) -> Vec<CitedSource> {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| CitedSource {
            label: format!("S{}", i + 1),
            id: hit.record.id.clone(),
            score: round4(hit.score),
            metadata: SourceMetadata {
                source: hit.record.source.clone(),
                chunk_index: hit.record.chunk_index,
                page: hit.record.page,
            },
            snippet: snippet(&hit.record.text),
        })
        .collect()
}
