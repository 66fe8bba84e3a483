// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Generation providers
//!
//! The answer composer issues exactly one generation request per query
//! through the `GenerationProvider` seam. A request either completes with
//! the full answer text or fails as a whole; no partial answers.

pub mod mock;
pub mod openai;

pub use mock::MockGeneration;
pub use openai::OpenAiChat;

use async_trait::async_trait;

use crate::errors::RagError;

/// One generation request, fully self-contained
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Grounding and citation instructions
    pub system_prompt: String,

    /// Context plus question
    pub user_message: String,

    pub temperature: f32,

    pub max_tokens: u32,
}

/// Contract for an external generation service
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate the answer text for a request
    ///
    /// Fails with `GenerationService` (or `Timeout`) on provider errors;
    /// retry/backoff is the caller's decision.
    async fn generate(&self, request: GenerationRequest) -> Result<String, RagError>;

    /// Model identity
    fn model_id(&self) -> &str;
}
