// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible chat completion servers.
//!
//! Provides [`ChatClient`], which handles request construction, optional
//! bearer authentication, and error mapping. Each call is a single attempt.

use std::time::Duration;

use cortex_core::CortexError;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::debug;

use crate::types::{ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse};

/// HTTP client for `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ChatClient {
    /// Creates a client for the server rooted at `base_url` (e.g. `http://host:8080/v1`).
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, CortexError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| CortexError::Config(format!("invalid API key header value: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| CortexError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends a completion request and returns the parsed response.
    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, CortexError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| CortexError::Provider {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, "chat completion response received");

        let body = response.text().await.map_err(|e| CortexError::Provider {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!("model server error ({status}): {}", api_err.error.message),
                Err(_) => format!("model server returned {status}: {body}"),
            };
            return Err(CortexError::provider(message));
        }

        serde_json::from_str(&body).map_err(|e| CortexError::Provider {
            message: format!("failed to parse completion response: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ApiMessage;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "memory".into(),
            messages: vec![ApiMessage {
                role: "user".into(),
                content: "Hello".into(),
            }],
            temperature: 0.1,
            max_tokens: 2048,
        }
    }

    #[test]
    fn endpoint_joins_base_url() {
        let client = ChatClient::new("http://localhost:8080/v1/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[tokio::test]
    async fn complete_success_with_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "memory", "max_tokens": 2048})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "qwen3-8b",
                "choices": [{"message": {"role": "assistant", "content": "Hi!"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatClient::new(
            &format!("{}/v1", server.uri()),
            Some("sk-test"),
            Duration::from_secs(5),
        )
        .unwrap();
        let response = client.complete(&request()).await.unwrap();
        assert_eq!(response.model.as_deref(), Some("qwen3-8b"));
        assert_eq!(response.choices.len(), 1);
    }

    #[tokio::test]
    async fn error_status_maps_to_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": {"message": "model loading"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri(), None, Duration::from_secs(5)).unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, CortexError::Provider { .. }));
        assert!(err.to_string().contains("model loading"));
    }

    #[tokio::test]
    async fn unparseable_body_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri(), None, Duration::from_secs(5)).unwrap();
        assert!(client.complete(&request()).await.is_err());
    }
}
