// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Query-time retrieval
//!
//! Embeds the query (single-item batch), normalizes it, searches the loaded
//! snapshot, and hydrates each hit back into its parallel text and metadata
//! entries. Ranking order comes from the index alone; results are never
//! reordered by any secondary criterion. Provider and index errors
//! propagate uncaught so the caller can decide on fallback behavior.

use std::sync::Arc;

use serde::Serialize;

use crate::embeddings::EmbeddingProvider;
use crate::errors::RagError;
use crate::index::{normalize_vector, VectorIndexSnapshot};

/// One retrieved passage, ephemeral to the query that produced it
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    /// Cosine similarity to the query
    pub score: f32,

    pub page_number: u32,

    pub chunk_id: String,

    /// Full chunk text
    pub text: String,
}

/// Retrieves ranked passages for a query against a shared snapshot
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    snapshot: Arc<VectorIndexSnapshot>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, snapshot: Arc<VectorIndexSnapshot>) -> Self {
        Self { embedder, snapshot }
    }

    /// Retrieve the top-k passages for a query, in index ranking order
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>, RagError> {
        let batch = [query.to_string()];
        let mut vectors = self.embedder.embed(&batch).await?;
        let query_vector = vectors.pop().ok_or_else(|| {
            RagError::EmbeddingService("provider returned no vector for query".to_string())
        })?;
        let query_vector = normalize_vector(&query_vector);

        let hits = self.snapshot.search(&query_vector, k)?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let (text, meta) = self.snapshot.entry(hit.index).ok_or_else(|| {
                RagError::InvariantViolation(format!(
                    "search returned index {} outside the snapshot",
                    hit.index
                ))
            })?;
            results.push(RetrievalResult {
                score: hit.score,
                page_number: meta.page_number,
                chunk_id: meta.chunk_id.clone(),
                text: text.to_string(),
            });
        }

        Ok(results)
    }
}
