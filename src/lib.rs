// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod chunker;
pub mod cli;
pub mod composer;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod errors;
pub mod generation;
pub mod index;
pub mod pages;
pub mod retriever;

// Re-export main types
pub use chunker::{chunk_corpus, chunk_page, chunk_text, ChunkMetadata};
pub use composer::{AnswerComposer, AnswerRecord, FALLBACK_ANSWER, SYSTEM_PROMPT};
pub use config::RagConfig;
pub use context::RagContext;
pub use embeddings::{EmbeddingProvider, HashEmbeddings, OpenAiEmbeddings};
pub use errors::RagError;
pub use generation::{GenerationProvider, GenerationRequest, MockGeneration, OpenAiChat};
pub use index::{IndexManifest, SearchHit, VectorIndexSnapshot};
pub use pages::{load_page, load_pages, Page};
pub use retriever::{RetrievalResult, Retriever};
