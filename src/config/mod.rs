// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Runtime configuration for the retrieval pipeline
//!
//! All settings come from environment variables (a `.env` file is honored by
//! the binary). The provider credential is required; everything else has a
//! default matching the reference pipeline. Construction happens once at
//! process start and the config is passed by reference from there on.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::RagError;

/// Default embedding model identity
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default generation model identity
pub const DEFAULT_GENERATION_MODEL: &str = "gpt-4o-mini";

/// Pipeline configuration, resolved once at startup
#[derive(Debug, Clone)]
pub struct RagConfig {
    /// API credential for the embedding/generation provider
    pub openai_api_key: String,

    /// Embedding model identity (fixes the vector dimension)
    pub embedding_model: String,

    /// Generation model identity
    pub generation_model: String,

    /// Embedding dimension for the configured model
    pub embedding_dimension: usize,

    /// Characters per chunk window
    pub chunk_size: usize,

    /// Character overlap between consecutive chunks (must be < chunk_size)
    pub chunk_overlap: usize,

    /// Top-k retrieved passages per query
    pub top_k: usize,

    /// Generation temperature
    pub temperature: f32,

    /// Maximum tokens in a generated answer
    pub max_answer_tokens: u32,

    /// Chunk texts embedded per provider request at build time
    pub embed_batch_size: usize,

    /// Per-request deadline for external provider calls
    pub request_timeout_secs: u64,

    /// Directory of cleaned `page_NNN.txt` files
    pub pages_dir: PathBuf,

    /// Directory for chunk files and the chunk manifest
    pub chunks_dir: PathBuf,

    /// Directory for the persisted vector index artifacts
    pub vectorstore_dir: PathBuf,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            embedding_dimension: 1536,
            chunk_size: 2000,
            chunk_overlap: 200,
            top_k: 4,
            temperature: 0.0,
            max_answer_tokens: 200,
            embed_batch_size: 64,
            request_timeout_secs: 30,
            pages_dir: PathBuf::from("clean_pages"),
            chunks_dir: PathBuf::from("chunks"),
            vectorstore_dir: PathBuf::from("vectorstore"),
        }
    }
}

impl RagConfig {
    /// Resolve configuration from the environment
    ///
    /// Fails fast with a `Configuration` error when `OPENAI_API_KEY` is
    /// absent or any numeric variable fails to parse or validate.
    pub fn from_env() -> Result<Self, RagError> {
        let openai_api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            RagError::Configuration(
                "OPENAI_API_KEY is not set (put it in the environment or a .env file)".to_string(),
            )
        })?;

        let config = Self {
            openai_api_key,
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string()),
            generation_model: env::var("GENERATION_MODEL")
                .unwrap_or_else(|_| DEFAULT_GENERATION_MODEL.to_string()),
            embedding_dimension: env_or("EMBEDDING_DIMENSION", 1536)?,
            chunk_size: env_or("CHUNK_SIZE", 2000)?,
            chunk_overlap: env_or("CHUNK_OVERLAP", 200)?,
            top_k: env_or("TOP_K", 4)?,
            temperature: env_or("TEMPERATURE", 0.0)?,
            max_answer_tokens: env_or("MAX_ANSWER_TOKENS", 200)?,
            embed_batch_size: env_or("EMBED_BATCH_SIZE", 64)?,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30)?,
            pages_dir: PathBuf::from(
                env::var("PAGES_DIR").unwrap_or_else(|_| "clean_pages".to_string()),
            ),
            chunks_dir: PathBuf::from(
                env::var("CHUNKS_DIR").unwrap_or_else(|_| "chunks".to_string()),
            ),
            vectorstore_dir: PathBuf::from(
                env::var("VECTORSTORE_DIR").unwrap_or_else(|_| "vectorstore".to_string()),
            ),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate numeric constraints
    ///
    /// The chunk window invariant (0 <= overlap < size) is checked here and
    /// again by the chunker, so a hand-built config cannot bypass it.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunk_size == 0 {
            return Err(RagError::Configuration(
                "CHUNK_SIZE must be greater than 0".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Configuration(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::Configuration(
                "TOP_K must be greater than 0".to_string(),
            ));
        }
        if self.embed_batch_size == 0 {
            return Err(RagError::Configuration(
                "EMBED_BATCH_SIZE must be greater than 0".to_string(),
            ));
        }
        if self.embedding_dimension == 0 {
            return Err(RagError::Configuration(
                "EMBEDDING_DIMENSION must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse an environment variable, falling back to a default when unset
fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, RagError> {
    match env::var(key) {
        Ok(value) => value.parse::<T>().map_err(|_| {
            RagError::Configuration(format!("{} has invalid value: {:?}", key, value))
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 2000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.top_k, 4);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let config = RagConfig {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
        assert!(err.to_string().contains("CHUNK_OVERLAP"));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let config = RagConfig {
            chunk_size: 0,
            chunk_overlap: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RagError::Configuration(_))
        ));
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let config = RagConfig {
            top_k: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RagError::Configuration(_))
        ));
    }
}
