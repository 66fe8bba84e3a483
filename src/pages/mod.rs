// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Page corpus loading
//!
//! The upstream splitter (outside this core) produces one `page_NNN.txt`
//! file per textbook page under a pages directory. This module reads that
//! corpus in page order for the build pipeline and serves single-page
//! lookups for the UI collaborator's "show full page" action.

use std::fs;
use std::path::Path;

use tracing::warn;

use crate::errors::RagError;

/// One ordered document unit, immutable once produced by the splitter
#[derive(Debug, Clone)]
pub struct Page {
    /// Positive, unique, contiguous within the corpus
    pub page_number: u32,

    /// Cleaned page text, trimmed
    pub raw_text: String,
}

/// File name for a given page number, e.g. `page_074.txt`
pub fn page_file_name(page_number: u32) -> String {
    format!("page_{:03}.txt", page_number)
}

/// Load every `page_NNN.txt` file from `dir` in ascending page order
///
/// Empty pages are skipped with a warning. Files that do not match the
/// naming contract are ignored (the directory may also hold manifests).
/// Returns `MissingArtifact` when the directory itself is absent.
pub fn load_pages(dir: &Path) -> Result<Vec<Page>, RagError> {
    if !dir.is_dir() {
        return Err(RagError::MissingArtifact(format!(
            "pages directory not found: {}",
            dir.display()
        )));
    }

    let mut names: Vec<(u32, String)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with("page_") || !name.ends_with(".txt") {
            continue;
        }
        match parse_page_number(&name) {
            Some(n) => names.push((n, name)),
            None => warn!(file = %name, "Skipping file with unparseable page number"),
        }
    }
    names.sort();

    let mut pages = Vec::with_capacity(names.len());
    for (page_number, name) in names {
        let raw_text = fs::read_to_string(dir.join(&name))?.trim().to_string();
        if raw_text.is_empty() {
            warn!(file = %name, "Page is empty, skipping");
            continue;
        }

        pages.push(Page {
            page_number,
            raw_text,
        });
    }

    Ok(pages)
}

/// Load the full text of one page
///
/// Absence is a non-fatal lookup miss (`MissingArtifact`), not a session
/// abort; the caller decides how to surface it.
pub fn load_page(dir: &Path, page_number: u32) -> Result<String, RagError> {
    let path = dir.join(page_file_name(page_number));
    if !path.is_file() {
        return Err(RagError::MissingArtifact(format!(
            "page file not found: {}",
            path.display()
        )));
    }
    Ok(fs::read_to_string(path)?)
}

/// Extract the page number from a `page_NNN.txt` file name
fn parse_page_number(file_name: &str) -> Option<u32> {
    let stem = file_name.strip_suffix(".txt")?;
    let digits = stem.strip_prefix("page_")?;
    digits.parse::<u32>().ok()
}
