// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Embedding providers
//!
//! Maps text (chunk or query) to a fixed-dimension dense vector behind the
//! `EmbeddingProvider` seam. The provider is an opaque external service:
//! one vector per input text, same order, batch boundaries never affect the
//! resulting vectors. Vectors come back raw; the index/retriever side
//! L2-normalizes before any cosine-via-inner-product comparison.

pub mod hashing;
pub mod openai;

pub use hashing::HashEmbeddings;
pub use openai::OpenAiEmbeddings;

use async_trait::async_trait;

use crate::errors::RagError;

/// Contract for an external embedding service
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, one vector per input, input order preserved
    ///
    /// Fails with `EmbeddingService` (or `Timeout`) on provider errors; the
    /// caller decides whether to retry or abort the whole build.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Fixed output dimension for this provider's model identity
    fn dimension(&self) -> usize;

    /// Model identity, recorded in the index manifest
    fn model_id(&self) -> &str;
}
