// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Deterministic mock generation provider
//!
//! Follows the composer's grounding instructions mechanically: it answers
//! from a labeled source only when the source shares a key term with the
//! question, cites the source's page, and otherwise returns the literal
//! fallback phrase. Used for offline runs and tests; no network.

use async_trait::async_trait;

use super::{GenerationProvider, GenerationRequest};
use crate::composer::FALLBACK_ANSWER;
use crate::errors::RagError;

const STOPWORDS: &[&str] = &[
    "what", "when", "where", "which", "whom", "whose", "does", "this", "that", "with", "from",
    "have", "about", "into", "explain", "define", "describe",
];

/// Instruction-following mock of the generation service
#[derive(Debug, Clone, Default)]
pub struct MockGeneration;

impl MockGeneration {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GenerationProvider for MockGeneration {
    async fn generate(&self, request: GenerationRequest) -> Result<String, RagError> {
        let sources = parse_sources(&request.user_message);
        let question = parse_question(&request.user_message);
        let terms = key_terms(&question);

        for (page_number, text) in &sources {
            let haystack = text.to_lowercase();
            if terms.iter().any(|term| haystack.contains(term)) {
                let sentence = first_sentence(text);
                return Ok(format!("{} [page {}]", sentence, page_number));
            }
        }

        Ok(FALLBACK_ANSWER.to_string())
    }

    fn model_id(&self) -> &str {
        "mock-grounded"
    }
}

/// Extract `(page_number, text)` pairs from the labeled grounding context
fn parse_sources(user_message: &str) -> Vec<(u32, String)> {
    let mut sources = Vec::new();
    let mut current_page: Option<u32> = None;
    let mut current_text = String::new();

    for line in user_message.lines() {
        if line.starts_with("--- SOURCE ") {
            if let Some(page) = current_page.take() {
                sources.push((page, current_text.trim().to_string()));
            }
            current_text.clear();
            current_page = parse_page_label(line);
        } else if line.starts_with("QUESTION: ") {
            break;
        } else if current_page.is_some() {
            current_text.push_str(line);
            current_text.push('\n');
        }
    }
    if let Some(page) = current_page {
        sources.push((page, current_text.trim().to_string()));
    }

    sources
}

/// Parse the page number out of `--- SOURCE i (page N) ---`
fn parse_page_label(line: &str) -> Option<u32> {
    let start = line.find("(page ")? + "(page ".len();
    let rest = &line[start..];
    let end = rest.find(')')?;
    rest[..end].trim().parse::<u32>().ok()
}

fn parse_question(user_message: &str) -> String {
    user_message
        .lines()
        .find_map(|line| line.strip_prefix("QUESTION: "))
        .unwrap_or("")
        .to_string()
}

/// Lowercased content words of at least four characters
fn key_terms(question: &str) -> Vec<String> {
    question
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 4 && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

fn first_sentence(text: &str) -> String {
    match text.find('.') {
        Some(pos) => text[..=pos].trim().to_string(),
        None => text.chars().take(200).collect::<String>().trim().to_string(),
    }
}
