// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Overlapping fixed-size chunking
//!
//! Splits normalized page text into character windows of `chunk_size`
//! characters, each overlapping the previous one by `chunk_overlap`
//! characters. Chunks are the atomic retrieval unit: each one carries a
//! typed metadata record tying it back to its page and position.
//!
//! Window invariant: for a page of length L chunked with size S and overlap
//! O (0 <= O < S), windows cover [0, L) contiguously; consecutive windows
//! overlap by exactly O characters, and only the final window may be
//! shorter than S. Each window is whitespace-trimmed before storage.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::RagError;
use crate::pages::Page;

/// Characters kept in the manifest preview field
pub const PREVIEW_CHARS: usize = 120;

/// Chunk manifest file name, written next to the chunk files
pub const MANIFEST_FILE: &str = "metadata.json";

/// Typed metadata record for one chunk
///
/// Denormalized on purpose: retrieval results and the persisted manifest
/// both need page/position context without a page lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Deterministic identifier, `page_{NNN}_chunk_{II}`
    pub chunk_id: String,

    /// Back-reference to the owning page
    pub page_number: u32,

    /// 1-based position within the page
    pub sequence_index: usize,

    /// Character count of the stored (trimmed) chunk text
    pub char_length: usize,

    /// First ~120 characters, newlines flattened
    pub preview: String,
}

/// Slide a window of `size` characters across `text`, overlapping by `overlap`
///
/// Pure function: persistence is a separate build-time side effect. Returns
/// a single chunk when the text fits in one window and no chunks for empty
/// text. Fails with a `Configuration` error when `overlap >= size` or
/// `size == 0`.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>, RagError> {
    if size == 0 {
        return Err(RagError::Configuration(
            "chunk size must be greater than 0".to_string(),
        ));
    }
    if overlap >= size {
        return Err(RagError::Configuration(format!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, size
        )));
    }

    // Windows are measured in characters, not bytes, so multi-byte text
    // never splits inside a code point.
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + size).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        chunks.push(window.trim().to_string());
        if start + size >= chars.len() {
            break;
        }
        start = start + size - overlap;
    }

    Ok(chunks)
}

/// Chunk one page into (text, metadata) pairs
///
/// Empty pages produce zero chunks and are skipped with a warning, not an
/// error.
pub fn chunk_page(
    page: &Page,
    size: usize,
    overlap: usize,
) -> Result<Vec<(String, ChunkMetadata)>, RagError> {
    if page.raw_text.trim().is_empty() {
        warn!(page = page.page_number, "Page is empty, producing no chunks");
        return Ok(Vec::new());
    }

    let chunks = chunk_text(&page.raw_text, size, overlap)?;
    let mut out = Vec::with_capacity(chunks.len());

    for (i, text) in chunks.into_iter().enumerate() {
        let sequence_index = i + 1;
        let meta = ChunkMetadata {
            chunk_id: format!("page_{:03}_chunk_{:02}", page.page_number, sequence_index),
            page_number: page.page_number,
            sequence_index,
            char_length: text.chars().count(),
            preview: preview_of(&text),
        };
        out.push((text, meta));
    }

    debug!(
        page = page.page_number,
        chunks = out.len(),
        "Chunked page"
    );
    Ok(out)
}

/// Chunk an entire corpus into parallel text/metadata sequences
///
/// The two returned vectors are index-aligned; downstream stages must keep
/// them in lockstep.
pub fn chunk_corpus(
    pages: &[Page],
    size: usize,
    overlap: usize,
) -> Result<(Vec<String>, Vec<ChunkMetadata>), RagError> {
    let mut texts = Vec::new();
    let mut metas = Vec::new();

    for page in pages {
        for (text, meta) in chunk_page(page, size, overlap)? {
            texts.push(text);
            metas.push(meta);
        }
    }

    Ok((texts, metas))
}

/// Persist chunk files and the chunk manifest
///
/// Each chunk lands in `{chunk_id}.txt` under `dir`, and `metadata.json`
/// lists every chunk for the corpus. Build-time side effect only; nothing
/// at serve time reads the individual chunk files.
pub fn write_chunks(
    dir: &Path,
    texts: &[String],
    metas: &[ChunkMetadata],
) -> Result<(), RagError> {
    if texts.len() != metas.len() {
        return Err(RagError::InvariantViolation(format!(
            "chunk texts ({}) and metadata ({}) are misaligned",
            texts.len(),
            metas.len()
        )));
    }

    fs::create_dir_all(dir)?;
    for (text, meta) in texts.iter().zip(metas.iter()) {
        fs::write(dir.join(format!("{}.txt", meta.chunk_id)), text)?;
    }

    let manifest = serde_json::to_string_pretty(metas)
        .map_err(|e| RagError::Serialization(e.to_string()))?;
    fs::write(dir.join(MANIFEST_FILE), manifest)?;

    Ok(())
}

/// Manifest preview: first ~120 characters with newlines flattened
fn preview_of(text: &str) -> String {
    text.chars()
        .take(PREVIEW_CHARS)
        .collect::<String>()
        .replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn page(n: u32, text: &str) -> Page {
        Page {
            page_number: n,
            raw_text: text.to_string(),
        }
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let err = chunk_text("some text", 10, 10).unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
        assert!(chunk_text("some text", 10, 11).is_err());
        assert!(chunk_text("some text", 0, 0).is_err());
    }

    #[test]
    fn test_short_text_yields_single_chunk() {
        let chunks = chunk_text("short", 2000, 200).unwrap();
        assert_eq!(chunks, vec!["short".to_string()]);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("", 100, 10).unwrap().is_empty());
    }

    #[test]
    fn test_coverage_no_character_skipped() {
        // With step = size - overlap, window starts cover every offset of
        // the text: reconstruct by dropping the overlapping prefix of each
        // subsequent window.
        let text: String = "abcdefghij".repeat(10); // 100 chars, no whitespace
        let (size, overlap) = (17, 5);
        let chunks = chunk_text(&text, size, overlap).unwrap();

        let mut rebuilt = chunks[0].clone();
        for chunk in &chunks[1..] {
            let tail: String = chunk.chars().skip(overlap).collect();
            rebuilt.push_str(&tail);
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_overlap_invariant_between_consecutive_chunks() {
        let text: String = "0123456789".repeat(4); // 40 chars
        let (size, overlap) = (10, 3);
        let chunks = chunk_text(&text, size, overlap).unwrap();
        assert!(chunks.len() > 2);

        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let next: Vec<char> = pair[1].chars().collect();
            let tail: String = prev[prev.len() - overlap..].iter().collect();
            let head: String = next[..overlap.min(next.len())].iter().collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_final_chunk_may_be_shorter() {
        let text: String = "x".repeat(25);
        let chunks = chunk_text(&text, 10, 2).unwrap();
        // starts at 0, 8, 16, 24
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks.last().unwrap().chars().count(), 1);
    }

    #[test]
    fn test_multibyte_text_not_split_inside_codepoint() {
        let text: String = "åäö".repeat(20);
        let chunks = chunk_text(&text, 7, 2).unwrap();
        let total: usize = chunks.iter().map(|c| c.chars().count()).sum();
        assert!(total >= 60);
    }

    #[test]
    fn test_chunk_page_metadata() {
        let p = page(3, &"m".repeat(25));
        let chunks = chunk_page(&p, 10, 2).unwrap();
        assert_eq!(chunks.len(), 4);

        let (text, meta) = &chunks[0];
        assert_eq!(meta.chunk_id, "page_003_chunk_01");
        assert_eq!(meta.page_number, 3);
        assert_eq!(meta.sequence_index, 1);
        assert_eq!(meta.char_length, text.chars().count());
        assert_eq!(chunks[3].1.chunk_id, "page_003_chunk_04");
    }

    #[test]
    fn test_empty_page_produces_zero_chunks() {
        let p = page(5, "   ");
        assert!(chunk_page(&p, 10, 2).unwrap().is_empty());
    }

    #[test]
    fn test_preview_flattens_newlines_and_truncates() {
        let text = format!("line one\nline two\n{}", "z".repeat(200));
        let p = page(1, &text);
        let chunks = chunk_page(&p, 2000, 200).unwrap();
        let preview = &chunks[0].1.preview;
        assert!(!preview.contains('\n'));
        assert_eq!(preview.chars().count(), PREVIEW_CHARS);
    }

    #[test]
    fn test_write_chunks_persists_files_and_manifest() {
        let dir = tempdir().unwrap();
        let p = page(1, &"q".repeat(25));
        let (texts, metas): (Vec<_>, Vec<_>) =
            chunk_page(&p, 10, 2).unwrap().into_iter().unzip();

        write_chunks(dir.path(), &texts, &metas).unwrap();

        let stored =
            std::fs::read_to_string(dir.path().join("page_001_chunk_01.txt")).unwrap();
        assert_eq!(stored, texts[0]);

        let manifest =
            std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
        let parsed: Vec<ChunkMetadata> = serde_json::from_str(&manifest).unwrap();
        assert_eq!(parsed, metas);
    }

    #[test]
    fn test_write_chunks_rejects_misaligned_inputs() {
        let dir = tempdir().unwrap();
        let metas = vec![ChunkMetadata {
            chunk_id: "page_001_chunk_01".to_string(),
            page_number: 1,
            sequence_index: 1,
            char_length: 1,
            preview: "a".to_string(),
        }];
        let err = write_chunks(dir.path(), &[], &metas).unwrap_err();
        assert!(matches!(err, RagError::InvariantViolation(_)));
    }
}
