// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use grounded_chat::rag::{chunk_text, normalize_whitespace, ChunkerConfig, RagError};
use tokio_test::{assert_err, assert_ok};

fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

#[test]
fn test_2000_char_document_gives_three_chunks() {
    let text: String = "abcdefghij".repeat(200);
    assert_eq!(text.chars().count(), 2000);

    let chunks = assert_ok!(chunk_text(&text, 800, 150));

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].chars().count(), 800);
    assert_eq!(chunks[1].chars().count(), 800);
    assert_eq!(chunks[1], text[650..1450]);
    assert_eq!(chunks[2], text[1300..]);
}

#[test]
fn test_chunks_cover_text_without_gaps() {
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(97);
    let clean = normalize_whitespace(&text);
    let (size, overlap) = (120, 30);

    let chunks = chunk_text(&text, size, overlap).unwrap();

    // Rebuild the text by dropping each chunk's overlap with its predecessor
    let mut rebuilt: Vec<char> = chars(&chunks[0]);
    for chunk in &chunks[1..] {
        let c = chars(chunk);
        assert_eq!(&rebuilt[rebuilt.len() - overlap..], &c[..overlap]);
        rebuilt.extend_from_slice(&c[overlap..]);
    }
    assert_eq!(rebuilt, chars(&clean));

    for chunk in &chunks[..chunks.len() - 1] {
        assert_eq!(chunk.chars().count(), size);
    }
    assert!(chunks.last().unwrap().chars().count() <= size);
}

#[test]
fn test_chunking_is_deterministic() {
    let text = "lorem ipsum dolor sit amet ".repeat(80);
    assert_eq!(
        chunk_text(&text, 200, 50).unwrap(),
        chunk_text(&text, 200, 50).unwrap()
    );
}

#[test]
fn test_non_ascii_text_never_splits_code_points() {
    let text = "日本語のテキスト、そして絵文字🙂も含む。".repeat(40);
    let chunks = chunk_text(&text, 64, 16).unwrap();

    assert!(chunks.len() > 1);
    for chunk in &chunks[..chunks.len() - 1] {
        assert_eq!(chunk.chars().count(), 64);
    }
}

#[test]
fn test_overlap_not_smaller_than_size_is_rejected() {
    let err = chunk_text("some text", 100, 100).unwrap_err();
    assert!(matches!(
        err,
        RagError::InvalidChunkConfig {
            size: 100,
            overlap: 100
        }
    ));
    assert_err!(ChunkerConfig::new(100, 150));
}

#[test]
fn test_whitespace_only_text_has_no_chunks() {
    assert!(chunk_text("\n\n\t   \r\n", 800, 150).unwrap().is_empty());
}
