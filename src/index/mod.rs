// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vector index snapshot
//!
//! Flat exact inner-product index over unit-normalized vectors, plus the
//! parallel ordered chunk texts and metadata. Position `i` in all three
//! collections refers to the same chunk; that alignment is the core
//! invariant and is validated at build and at load.
//!
//! Exact flat search (not ANN) keeps the contract bit-stable: results are
//! ordered by descending inner product with ties broken by lower internal
//! index, and a persisted-then-reloaded snapshot returns identical results
//! for the same query vector.
//!
//! ## Artifacts
//!
//! - `vectors.bin` - opaque bincode blob of normalized vectors, insertion order
//! - `texts.json` - parallel chunk texts
//! - `metas.json` - parallel chunk metadata
//! - `index_manifest.json` - model identity, dimension, counts, build time
//!
//! A rebuild stages the new artifact set in a sibling directory and renames
//! it into place, so the persisted location never holds a partial index.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chunker::ChunkMetadata;
use crate::errors::RagError;

pub const VECTORS_FILE: &str = "vectors.bin";
pub const TEXTS_FILE: &str = "texts.json";
pub const METAS_FILE: &str = "metas.json";
pub const MANIFEST_FILE: &str = "index_manifest.json";

/// Versioned contract between the build and serve processes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Embedding model identity the vectors were produced with
    pub model_id: String,

    /// Vector dimension
    pub dimension: usize,

    /// Number of indexed chunks
    pub vector_count: usize,

    /// Chunk window parameters used at build time
    pub chunk_size: usize,
    pub chunk_overlap: usize,

    pub built_at: DateTime<Utc>,
}

/// One search result: similarity score plus internal index
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Inner product of unit vectors, i.e. cosine similarity
    pub score: f32,

    /// Internal index into the parallel collections
    pub index: usize,
}

/// Immutable snapshot of vectors, texts, and metadata
///
/// Built once from the chunking+embedding output, persisted, then loaded
/// read-only at query time. Logically immutable: any number of concurrent
/// searches may share it behind an `Arc`.
#[derive(Debug)]
pub struct VectorIndexSnapshot {
    vectors: Vec<Vec<f32>>,
    texts: Vec<String>,
    metas: Vec<ChunkMetadata>,
    manifest: IndexManifest,
}

impl VectorIndexSnapshot {
    /// Build a snapshot from parallel sequences
    ///
    /// Vectors are L2-normalized on insertion so inner-product search
    /// equals cosine similarity. Fails with `InvariantViolation` when the
    /// sequences are misaligned, empty, dimension-inconsistent, or contain
    /// non-finite values.
    pub fn build(
        vectors: Vec<Vec<f32>>,
        texts: Vec<String>,
        metas: Vec<ChunkMetadata>,
        manifest: IndexManifest,
    ) -> Result<Self, RagError> {
        if vectors.len() != texts.len() || vectors.len() != metas.len() {
            return Err(RagError::InvariantViolation(format!(
                "parallel collections misaligned: {} vectors, {} texts, {} metadata records",
                vectors.len(),
                texts.len(),
                metas.len()
            )));
        }
        if vectors.is_empty() {
            return Err(RagError::InvariantViolation(
                "cannot build an index from an empty corpus".to_string(),
            ));
        }

        let dimension = manifest.dimension;
        let mut normalized = Vec::with_capacity(vectors.len());
        for (i, vector) in vectors.into_iter().enumerate() {
            if vector.len() != dimension {
                return Err(RagError::InvariantViolation(format!(
                    "vector {} has dimension {}, expected {}",
                    i,
                    vector.len(),
                    dimension
                )));
            }
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(RagError::InvariantViolation(format!(
                    "vector {} contains NaN or Infinity values",
                    i
                )));
            }
            normalized.push(normalize_vector(&vector));
        }

        let manifest = IndexManifest {
            vector_count: normalized.len(),
            ..manifest
        };

        Ok(Self {
            vectors: normalized,
            texts,
            metas,
            manifest,
        })
    }

    /// Search for the k nearest neighbors by inner product
    ///
    /// Returns up to `k` hits in descending score order, ties broken by
    /// lower internal index. `k` larger than the stored item count returns
    /// all items. The query is expected to be unit-normalized by the caller.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, RagError> {
        if k == 0 {
            return Err(RagError::Configuration(
                "search k must be greater than 0".to_string(),
            ));
        }
        if query.len() != self.manifest.dimension {
            return Err(RagError::InvariantViolation(format!(
                "query has dimension {}, index expects {}",
                query.len(),
                self.manifest.dimension
            )));
        }
        if query.iter().any(|v| !v.is_finite()) {
            return Err(RagError::InvariantViolation(
                "query vector contains NaN or Infinity values".to_string(),
            ));
        }

        let mut hits: Vec<SearchHit> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(index, vector)| SearchHit {
                score: dot(query, vector),
                index,
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });
        hits.truncate(k);

        Ok(hits)
    }

    /// Text and metadata at an internal index, if in range
    pub fn entry(&self, index: usize) -> Option<(&str, &ChunkMetadata)> {
        match (self.texts.get(index), self.metas.get(index)) {
            (Some(text), Some(meta)) => Some((text.as_str(), meta)),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// Persist the snapshot, replacing any previous index atomically
    ///
    /// Artifacts are staged into `<dir>.tmp` and renamed into place, so a
    /// failed build never leaves a partially written index behind.
    pub fn save(&self, dir: &Path) -> Result<(), RagError> {
        let staging = dir.with_extension("tmp");
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let blob = bincode::serialize(&self.vectors)
            .map_err(|e| RagError::Serialization(e.to_string()))?;
        fs::write(staging.join(VECTORS_FILE), blob)?;

        let texts = serde_json::to_string(&self.texts)
            .map_err(|e| RagError::Serialization(e.to_string()))?;
        fs::write(staging.join(TEXTS_FILE), texts)?;

        let metas = serde_json::to_string_pretty(&self.metas)
            .map_err(|e| RagError::Serialization(e.to_string()))?;
        fs::write(staging.join(METAS_FILE), metas)?;

        let manifest = serde_json::to_string_pretty(&self.manifest)
            .map_err(|e| RagError::Serialization(e.to_string()))?;
        fs::write(staging.join(MANIFEST_FILE), manifest)?;

        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        fs::rename(&staging, dir)?;

        info!(
            vectors = self.manifest.vector_count,
            dir = %dir.display(),
            "Saved vector index snapshot"
        );
        Ok(())
    }

    /// Load a previously persisted snapshot
    ///
    /// Fails with `IndexNotLoaded` when no index has been built at `dir`,
    /// and with `InvariantViolation` when the artifacts disagree with each
    /// other or with their manifest.
    pub fn load(dir: &Path) -> Result<Self, RagError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(RagError::IndexNotLoaded(format!(
                "no index artifacts at {} (run the build first)",
                dir.display()
            )));
        }

        let manifest: IndexManifest =
            serde_json::from_str(&fs::read_to_string(manifest_path)?)
                .map_err(|e| RagError::Serialization(e.to_string()))?;

        let blob = fs::read(dir.join(VECTORS_FILE))?;
        let vectors: Vec<Vec<f32>> = bincode::deserialize(&blob)
            .map_err(|e| RagError::Serialization(e.to_string()))?;

        let texts: Vec<String> =
            serde_json::from_str(&fs::read_to_string(dir.join(TEXTS_FILE))?)
                .map_err(|e| RagError::Serialization(e.to_string()))?;

        let metas: Vec<ChunkMetadata> =
            serde_json::from_str(&fs::read_to_string(dir.join(METAS_FILE))?)
                .map_err(|e| RagError::Serialization(e.to_string()))?;

        if vectors.len() != manifest.vector_count
            || texts.len() != manifest.vector_count
            || metas.len() != manifest.vector_count
        {
            return Err(RagError::InvariantViolation(format!(
                "persisted artifacts misaligned: manifest says {}, found {} vectors / {} texts / {} metadata records",
                manifest.vector_count,
                vectors.len(),
                texts.len(),
                metas.len()
            )));
        }

        // Vectors were normalized before persisting; trust but verify the
        // dimension so a stale blob cannot serve wrong-model queries.
        if let Some(v) = vectors.first() {
            if v.len() != manifest.dimension {
                return Err(RagError::InvariantViolation(format!(
                    "persisted vectors are {}-dimensional, manifest says {}",
                    v.len(),
                    manifest.dimension
                )));
            }
        }

        Ok(Self {
            vectors,
            texts,
            metas,
            manifest,
        })
    }
}

/// Scale a vector to unit L2 norm
///
/// Zero and non-finite magnitudes pass the vector through unchanged.
pub fn normalize_vector(vector: &[f32]) -> Vec<f32> {
    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude == 0.0 || !magnitude.is_finite() {
        return vector.to_vec();
    }
    vector.iter().map(|x| x / magnitude).collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
