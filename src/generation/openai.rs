// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OpenAI chat-completions generation provider

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{GenerationProvider, GenerationRequest};
use crate::errors::RagError;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Generation provider backed by the OpenAI chat completions API
pub struct OpenAiChat {
    api_key: String,
    model: String,
    timeout_secs: u64,
    client: Client,
}

impl OpenAiChat {
    /// Create a new provider with a per-request deadline
    pub fn new(api_key: String, model: String, timeout_secs: u64) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RagError::Configuration(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            model,
            timeout_secs,
            client,
        })
    }
}

#[async_trait]
impl GenerationProvider for OpenAiChat {
    async fn generate(&self, request: GenerationRequest) -> Result<String, RagError> {
        let response = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": request.system_prompt },
                    { "role": "user", "content": request.user_message },
                ],
                "temperature": request.temperature,
                "max_tokens": request.max_tokens,
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RagError::Timeout {
                        operation: "generation request".to_string(),
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    RagError::GenerationService(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RagError::GenerationService(format!(
                "HTTP {}: {}",
                status.as_u16(),
                message
            )));
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| RagError::GenerationService(format!("JSON parse error: {}", e)))?;

        let choice = data.choices.into_iter().next().ok_or_else(|| {
            RagError::GenerationService("response contained no choices".to_string())
        })?;

        Ok(choice.message.content)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider =
            OpenAiChat::new("test-key".to_string(), "gpt-4o-mini".to_string(), 30).unwrap();
        assert_eq!(provider.model_id(), "gpt-4o-mini");
    }
}
