// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Citation-constrained answer composition
//!
//! Builds a grounding context from the retrieved passages, labeled with
//! page numbers and ordinal source indices in retrieval order (no
//! re-ranking, no deduplication; duplicate chunks from the same page pass
//! through as-is), and issues exactly one generation request. Citations
//! are enforced by instruction only; there is no post-hoc verification
//! that a cited page supports the adjacent claim. That is an accepted
//! limitation of this pipeline, not an oversight.

use std::sync::Arc;

use tracing::debug;

use crate::errors::RagError;
use crate::generation::{GenerationProvider, GenerationRequest};
use crate::retriever::RetrievalResult;

/// Literal phrase the model must return when no retrieved passage supports
/// an answer. A successful "no evidence" outcome, distinct from an error.
pub const FALLBACK_ANSWER: &str = "I cannot find a reliable answer in the provided pages.";

/// Grounding and citation instructions sent with every request
pub const SYSTEM_PROMPT: &str = "You are a precise study assistant. Use ONLY the provided SOURCE TEXTS to answer. \
If the answer is found in the sources, cite the page number(s) in square brackets after the sentence or clause, e.g. [page 74]. \
If the answer is not in the provided sources, say: 'I cannot find a reliable answer in the provided pages.' Do NOT hallucinate.";

/// A composed answer with the passages it was grounded on
#[derive(Debug, Clone)]
pub struct AnswerRecord {
    pub query: String,

    /// Answer text with inline `[page N]` citation markers
    pub answer_text: String,

    /// Grounding passages, in retrieval order
    pub retrieved: Vec<RetrievalResult>,
}

/// Composes citation-constrained answers via a generation provider
pub struct AnswerComposer {
    generator: Arc<dyn GenerationProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl AnswerComposer {
    pub fn new(generator: Arc<dyn GenerationProvider>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            generator,
            temperature,
            max_tokens,
        }
    }

    /// Label each retrieved passage with its ordinal index and page number
    pub fn build_context(retrieved: &[RetrievalResult]) -> String {
        let mut ctx = String::new();
        for (i, result) in retrieved.iter().enumerate() {
            ctx.push_str(&format!(
                "--- SOURCE {} (page {}) ---\n{}\n\n",
                i + 1,
                result.page_number,
                result.text
            ));
        }
        ctx
    }

    fn build_user_message(query: &str, retrieved: &[RetrievalResult]) -> String {
        format!(
            "CONTEXT:\n{}\nQUESTION: {}\n\n\
             Answer concisely in simple language suitable for a student. Include short citations \
             like [page 74] immediately after any factual statement taken from the sources. If \
             multiple pages support the same fact, you may include multiple citations, e.g. \
             [page 74, page 76].",
            Self::build_context(retrieved),
            query
        )
    }

    /// Compose an answer grounded in the retrieved passages
    ///
    /// One request to the generation service; on failure the error
    /// propagates and no partial answer is returned.
    pub async fn compose(
        &self,
        query: &str,
        retrieved: Vec<RetrievalResult>,
    ) -> Result<AnswerRecord, RagError> {
        let request = GenerationRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_message: Self::build_user_message(query, &retrieved),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            sources = retrieved.len(),
            model = self.generator.model_id(),
            "Composing answer"
        );
        let answer_text = self.generator.generate(request).await?;

        Ok(AnswerRecord {
            query: query.to_string(),
            answer_text,
            retrieved,
        })
    }
}
