// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process lifecycle and pipeline orchestration
//!
//! `RagContext` replaces the reference pipeline's module-level singletons
//! with explicit initialization: construct it once at startup from config,
//! run the build phase or load the persisted snapshot for serving, and pass
//! the context by reference afterwards. The loaded snapshot is shared
//! read-only, so concurrent `answer` calls need no coordination.
//!
//! Build and serve phases never interleave on one snapshot: a build stages
//! a complete artifact set and atomically replaces the persisted index.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::info;

use crate::chunker;
use crate::composer::{AnswerComposer, AnswerRecord};
use crate::config::RagConfig;
use crate::embeddings::{EmbeddingProvider, OpenAiEmbeddings};
use crate::errors::RagError;
use crate::generation::{GenerationProvider, OpenAiChat};
use crate::index::{IndexManifest, VectorIndexSnapshot};
use crate::pages;
use crate::retriever::{RetrievalResult, Retriever};

/// Explicitly initialized pipeline state
pub struct RagContext {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    snapshot: Option<Arc<VectorIndexSnapshot>>,
}

impl RagContext {
    /// Construct a context wired to the OpenAI providers from config
    pub fn new(config: RagConfig) -> Result<Self, RagError> {
        config.validate()?;
        if config.openai_api_key.is_empty() {
            return Err(RagError::Configuration(
                "provider API key is empty".to_string(),
            ));
        }

        let embedder = OpenAiEmbeddings::new(
            config.openai_api_key.clone(),
            config.embedding_model.clone(),
            config.embedding_dimension,
            config.request_timeout_secs,
        )?;
        let generator = OpenAiChat::new(
            config.openai_api_key.clone(),
            config.generation_model.clone(),
            config.request_timeout_secs,
        )?;

        Ok(Self {
            config,
            embedder: Arc::new(embedder),
            generator: Arc::new(generator),
            snapshot: None,
        })
    }

    /// Construct a context with caller-supplied providers (offline, tests)
    pub fn with_providers(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Result<Self, RagError> {
        config.validate()?;
        Ok(Self {
            config,
            embedder,
            generator,
            snapshot: None,
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Build phase: pages -> chunks -> vectors -> persisted snapshot
    ///
    /// Chunk files and the chunk manifest are written as a build side
    /// effect; embedding runs in fixed-size batches so only one batch of
    /// provider activations is in flight at a time. Any error aborts the
    /// whole build with no partial index written.
    pub async fn build_index(&mut self) -> Result<IndexManifest, RagError> {
        let started = Instant::now();
        let config = &self.config;

        let corpus = pages::load_pages(&config.pages_dir)?;
        info!(pages = corpus.len(), dir = %config.pages_dir.display(), "Loaded page corpus");

        let (texts, metas) =
            chunker::chunk_corpus(&corpus, config.chunk_size, config.chunk_overlap)?;
        if texts.is_empty() {
            return Err(RagError::InvariantViolation(format!(
                "corpus at {} produced no chunks",
                config.pages_dir.display()
            )));
        }
        chunker::write_chunks(&config.chunks_dir, &texts, &metas)?;
        info!(chunks = texts.len(), "Chunked corpus and wrote chunk manifest");

        let mut vectors = Vec::with_capacity(texts.len());
        for (batch_no, batch) in texts.chunks(config.embed_batch_size).enumerate() {
            let embedded = self.embedder.embed(batch).await?;
            vectors.extend(embedded);
            info!(
                batch = batch_no + 1,
                embedded = vectors.len(),
                total = texts.len(),
                "Embedded chunk batch"
            );
        }

        let manifest = IndexManifest {
            model_id: self.embedder.model_id().to_string(),
            dimension: self.embedder.dimension(),
            vector_count: 0,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            built_at: Utc::now(),
        };

        let snapshot = VectorIndexSnapshot::build(vectors, texts, metas, manifest)?;
        snapshot.save(&config.vectorstore_dir)?;

        let manifest = snapshot.manifest().clone();
        info!(
            vectors = manifest.vector_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Index build complete"
        );

        self.snapshot = Some(Arc::new(snapshot));
        Ok(manifest)
    }

    /// Serving phase: load the persisted snapshot read-only
    ///
    /// Fails with `IndexNotLoaded` when no index has been built yet.
    pub fn load_serving(&mut self) -> Result<(), RagError> {
        let snapshot = VectorIndexSnapshot::load(&self.config.vectorstore_dir)?;
        info!(
            vectors = snapshot.manifest().vector_count,
            model = %snapshot.manifest().model_id,
            "Loaded vector index snapshot"
        );
        self.snapshot = Some(Arc::new(snapshot));
        Ok(())
    }

    fn snapshot(&self) -> Result<Arc<VectorIndexSnapshot>, RagError> {
        self.snapshot.clone().ok_or_else(|| {
            RagError::IndexNotLoaded(
                "no snapshot loaded; call build_index or load_serving first".to_string(),
            )
        })
    }

    /// The single operation exposed to the UI/CLI collaborator
    ///
    /// Retrieves the top-k passages for the query and composes a
    /// citation-constrained answer. Errors are isolated to this query and
    /// never unload the shared snapshot.
    pub async fn answer(&self, query: &str) -> Result<(String, Vec<RetrievalResult>), RagError> {
        let snapshot = self.snapshot()?;
        let retriever = Retriever::new(self.embedder.clone(), snapshot);
        let retrieved = retriever.retrieve(query, self.config.top_k).await?;

        let composer = AnswerComposer::new(
            self.generator.clone(),
            self.config.temperature,
            self.config.max_answer_tokens,
        );
        let AnswerRecord {
            answer_text,
            retrieved,
            ..
        } = composer.compose(query, retrieved).await?;

        Ok((answer_text, retrieved))
    }

    /// Full text of one page, for the collaborator's "show full page"
    pub fn show_page(&self, page_number: u32) -> Result<String, RagError> {
        pages::load_page(&self.config.pages_dir, page_number)
    }
}
