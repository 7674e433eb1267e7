// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for OpenAI-compatible chat completion and embedding endpoints.

use serde::{Deserialize, Serialize};

// --- Chat completions ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: String,
    pub content: String,
}

/// Body of `POST {base_url}/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ApiMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

/// Assistant message. Reasoning servers may leave `content` empty and put
/// the text in `reasoning_content`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
}

impl ResponseMessage {
    /// Returns `content`, or `reasoning_content` when content is missing or empty.
    pub fn text(self) -> String {
        self.content
            .filter(|c| !c.is_empty())
            .or(self.reasoning_content)
            .unwrap_or_default()
    }
}

// --- Embeddings ---

#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingRequest<'a> {
    pub input: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingResponse {
    #[serde(default)]
    pub data: Vec<EmbeddingData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingData {
    #[serde(default)]
    pub embedding: Vec<f32>,
}

// --- Errors ---

/// Error body used by OpenAI-compatible servers.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub message: String,
}
