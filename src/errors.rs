// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the retrieval core
//!
//! One taxonomy covers both phases:
//! - Build-phase errors (configuration, invariant violations) are fatal and
//!   must abort before any partial artifact is written.
//! - Serving-phase errors (provider failures, timeouts) are isolated to the
//!   query that raised them; the caller decides on retry/backoff.

use thiserror::Error;

/// Errors raised by the chunking/embedding/index/answer pipeline
#[derive(Error, Debug)]
pub enum RagError {
    /// Invalid configuration (bad chunk window, missing credential).
    /// Fatal at startup; the process must not proceed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal consistency failure (misaligned parallel collections,
    /// empty corpus). Fatal at build time.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// External embedding provider failure (request error, rate limit,
    /// malformed response). The core never retries on its own.
    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    /// External generation provider failure. No partial answer is returned.
    #[error("Generation service error: {0}")]
    GenerationService(String),

    /// Search was requested before a snapshot was built or loaded.
    #[error("Vector index not loaded: {0}")]
    IndexNotLoaded(String),

    /// A persisted page or chunk file is absent. Non-fatal lookup miss,
    /// reported to the caller rather than aborting the session.
    #[error("Missing artifact: {0}")]
    MissingArtifact(String),

    /// An external call exceeded its deadline and was abandoned.
    #[error("{operation} timed out after {timeout_secs}s")]
    Timeout {
        operation: String,
        timeout_secs: u64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RagError {
    /// Short error code for logging
    pub fn error_code(&self) -> &'static str {
        match self {
            RagError::Configuration(_) => "CONFIGURATION",
            RagError::InvariantViolation(_) => "INVARIANT_VIOLATION",
            RagError::EmbeddingService(_) => "EMBEDDING_SERVICE",
            RagError::GenerationService(_) => "GENERATION_SERVICE",
            RagError::IndexNotLoaded(_) => "INDEX_NOT_LOADED",
            RagError::MissingArtifact(_) => "MISSING_ARTIFACT",
            RagError::Timeout { .. } => "TIMEOUT",
            RagError::Io(_) => "IO_ERROR",
            RagError::Serialization(_) => "SERIALIZATION",
        }
    }

    /// Whether the caller may reasonably retry the failed operation
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RagError::EmbeddingService(_)
                | RagError::GenerationService(_)
                | RagError::Timeout { .. }
        )
    }

    /// Whether the error must abort the process (startup/build phase)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RagError::Configuration(_)
                | RagError::InvariantViolation(_)
                | RagError::IndexNotLoaded(_)
        )
    }
}
