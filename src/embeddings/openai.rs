// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OpenAI embeddings provider
//!
//! Calls the `/v1/embeddings` endpoint. One request per batch; the response
//! carries an index per vector which is used to restore input order before
//! returning.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::EmbeddingProvider;
use crate::errors::RagError;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Embedding provider backed by the OpenAI embeddings API
pub struct OpenAiEmbeddings {
    api_key: String,
    model: String,
    dimension: usize,
    timeout_secs: u64,
    client: Client,
}

impl OpenAiEmbeddings {
    /// Create a new provider
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API key
    /// * `model` - embedding model identity (e.g. `text-embedding-3-small`)
    /// * `dimension` - expected vector dimension for that model
    /// * `timeout_secs` - per-request deadline; a triggered deadline
    ///   abandons the in-flight call and surfaces `Timeout`
    pub fn new(
        api_key: String,
        model: String,
        dimension: usize,
        timeout_secs: u64,
    ) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RagError::Configuration(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            model,
            dimension,
            timeout_secs,
            client,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(OPENAI_EMBEDDINGS_URL)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "input": texts,
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RagError::Timeout {
                        operation: "embedding request".to_string(),
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    RagError::EmbeddingService(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RagError::EmbeddingService(format!(
                "HTTP {}: {}",
                status.as_u16(),
                message
            )));
        }

        let data: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| RagError::EmbeddingService(format!("JSON parse error: {}", e)))?;

        if data.data.len() != texts.len() {
            return Err(RagError::EmbeddingService(format!(
                "expected {} vectors, got {}",
                texts.len(),
                data.data.len()
            )));
        }

        // The API may reorder entries; the index field restores input order.
        let mut items = data.data;
        items.sort_by_key(|item| item.index);

        let mut vectors = Vec::with_capacity(items.len());
        for item in items {
            if item.embedding.len() != self.dimension {
                return Err(RagError::EmbeddingService(format!(
                    "model {} returned {}-dimensional vector, expected {}",
                    self.model,
                    item.embedding.len(),
                    self.dimension
                )));
            }
            vectors.push(item.embedding);
        }

        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = OpenAiEmbeddings::new(
            "test-key".to_string(),
            "text-embedding-3-small".to_string(),
            1536,
            30,
        )
        .unwrap();
        assert_eq!(provider.model_id(), "text-embedding-3-small");
        assert_eq!(provider.dimension(), 1536);
    }

    #[tokio::test]
    async fn test_empty_batch_short_circuits() {
        let provider = OpenAiEmbeddings::new(
            "test-key".to_string(),
            "text-embedding-3-small".to_string(),
            1536,
            30,
        )
        .unwrap();
        // No texts means no network call and no vectors.
        let vectors = provider.embed(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
