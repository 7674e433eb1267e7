// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible adapters for the Cortex memory service.
//!
//! [`OpenAiProvider`] implements [`ProviderAdapter`] against any server that
//! speaks `POST /chat/completions`. [`HttpEmbedder`] implements
//! [`EmbeddingAdapter`](cortex_core::EmbeddingAdapter) against a single-text
//! embedding endpoint.

pub mod client;
pub mod embedder;
pub mod types;

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use cortex_config::model::ModelConfig;
use cortex_core::types::{AdapterType, HealthStatus, ProviderRequest, ProviderResponse};
use cortex_core::{CortexError, PluginAdapter, ProviderAdapter};
use regex::Regex;
use tracing::{debug, info};

pub use embedder::HttpEmbedder;

use crate::client::ChatClient;
use crate::types::{ApiMessage, ChatCompletionRequest};

static REASONING_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

/// Chat model provider for OpenAI-compatible servers.
pub struct OpenAiProvider {
    client: ChatClient,
    model: String,
}

impl OpenAiProvider {
    /// Creates a provider from the `[model]` configuration section.
    pub fn new(config: &ModelConfig) -> Result<Self, CortexError> {
        let client = ChatClient::new(
            &config.base_url,
            config.api_key.as_deref(),
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(
            endpoint = client.endpoint(),
            model = config.model,
            "chat model provider initialized"
        );
        Ok(Self {
            client,
            model: config.model.clone(),
        })
    }

    fn to_completion_request(&self, request: ProviderRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: request
                .messages
                .into_iter()
                .map(|m| ApiMessage {
                    role: m.role,
                    content: m.content,
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

/// Removes `<think>...</think>` blocks and surrounding whitespace.
fn strip_reasoning(text: &str) -> String {
    REASONING_BLOCK.replace_all(text, "").trim().to_string()
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, CortexError> {
        // No probe request: a completion call would load the model.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CortexError> {
        debug!("chat model provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, CortexError> {
        let api_request = self.to_completion_request(request);
        let response = self.client.complete(&api_request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CortexError::provider("completion response contained no choices"))?;

        Ok(ProviderResponse {
            content: strip_reasoning(&choice.message.text()),
            model: response.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::types::ChatMessage;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::new(&ModelConfig {
            base_url: format!("{}/v1", server.uri()),
            model: "memory".into(),
            ..ModelConfig::default()
        })
        .unwrap()
    }

    fn request() -> ProviderRequest {
        ProviderRequest {
            messages: vec![
                ChatMessage::system("Extract facts."),
                ChatMessage::user("[user]: I have a cat"),
            ],
            max_tokens: 2048,
            temperature: 0.1,
        }
    }

    #[test]
    fn strip_reasoning_removes_think_blocks() {
        assert_eq!(
            strip_reasoning("<think>\nhmm\n</think>\n[\"a\"]"),
            "[\"a\"]"
        );
        assert_eq!(strip_reasoning("  plain  "), "plain");
    }

    #[tokio::test]
    async fn complete_sends_messages_and_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "memory",
                "messages": [
                    {"role": "system", "content": "Extract facts."},
                    {"role": "user", "content": "[user]: I have a cat"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "qwen3-8b",
                "choices": [{"message": {"role": "assistant", "content": "<think>ok</think>[]"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider(&server).complete(request()).await.unwrap();
        assert_eq!(response.content, "[]");
        assert_eq!(response.model, "qwen3-8b");
    }

    #[tokio::test]
    async fn complete_falls_back_to_reasoning_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "", "reasoning_content": "the answer"}}]
            })))
            .mount(&server)
            .await;

        let response = provider(&server).complete(request()).await.unwrap();
        assert_eq!(response.content, "the answer");
        assert_eq!(response.model, "memory");
    }

    #[tokio::test]
    async fn no_choices_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let err = provider(&server).complete(request()).await.unwrap_err();
        assert!(matches!(err, CortexError::Provider { .. }));
    }
}
