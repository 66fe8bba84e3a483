// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Deterministic hash-based embedding provider
//!
//! Expands a SHA-256 digest of the input text into a fixed-dimension
//! vector. Identical texts always map to identical vectors (so exact-text
//! self-retrieval scores 1.0) and distinct texts map to unrelated ones.
//! Used for offline runs and tests; carries no semantic signal.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::EmbeddingProvider;
use crate::errors::RagError;

/// Default dimension, matching small sentence-transformer models
pub const DEFAULT_HASH_DIMENSION: usize = 384;

/// Offline embedding provider backed by SHA-256 expansion
#[derive(Debug, Clone)]
pub struct HashEmbeddings {
    dimension: usize,
}

impl HashEmbeddings {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let digest = hasher.finalize();

        let mut vector = Vec::with_capacity(self.dimension);
        // Re-hash per 32-value block so the vector has no short period.
        let mut block = digest;
        for i in 0..self.dimension {
            let j = i % block.len();
            if i > 0 && j == 0 {
                block = Sha256::digest(&block);
            }
            // Map byte to [-1, 1]
            vector.push((block[j] as f32 / 255.0) * 2.0 - 1.0);
        }
        vector
    }
}

impl Default for HashEmbeddings {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        "hash-sha256"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deterministic_per_text() {
        let provider = HashEmbeddings::default();
        let texts = vec!["acute inflammation".to_string()];
        let a = provider.embed(&texts).await.unwrap();
        let b = provider.embed(&texts).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), DEFAULT_HASH_DIMENSION);
    }

    #[tokio::test]
    async fn test_batch_boundaries_do_not_affect_vectors() {
        let provider = HashEmbeddings::default();
        let one = vec!["alpha".to_string()];
        let two = vec!["beta".to_string()];
        let both = vec!["alpha".to_string(), "beta".to_string()];

        let separate_a = provider.embed(&one).await.unwrap();
        let separate_b = provider.embed(&two).await.unwrap();
        let batched = provider.embed(&both).await.unwrap();

        assert_eq!(batched[0], separate_a[0]);
        assert_eq!(batched[1], separate_b[0]);
    }

    #[tokio::test]
    async fn test_distinct_texts_distinct_vectors() {
        let provider = HashEmbeddings::new(64);
        let texts = vec!["one".to_string(), "two".to_string()];
        let vectors = provider.embed(&texts).await.unwrap();
        assert_ne!(vectors[0], vectors[1]);
        assert_eq!(vectors[0].len(), 64);
    }
}
