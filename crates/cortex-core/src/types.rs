// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Cortex service.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identity of a stored memory, assigned by the store on insert.
pub type MemoryId = i64;

/// Default importance for facts that do not carry one.
pub const DEFAULT_IMPORTANCE: i64 = 5;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Storage,
    Embedding,
    Observability,
}

// --- Conversation types ---

/// One message of a chat transcript submitted for ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Speaker role (`user`, `assistant`, ...).
    #[serde(default = "default_role")]
    pub role: String,
    /// Optional display name of the speaker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Message text. Empty messages are ignored by ingestion.
    #[serde(default)]
    pub content: String,
}

fn default_role() -> String {
    "unknown".to_string()
}

impl ConversationMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            name: None,
            content: content.into(),
        }
    }

    /// Label used when the message is rendered into a transcript line.
    pub fn speaker(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&self.role)
    }
}

// --- Memory types ---

/// A fact ready to be inserted into the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMemory {
    pub user_id: Option<String>,
    pub topic: String,
    pub fact: String,
    pub source_session: Option<String>,
    pub source_channel: Option<String>,
    pub importance: i64,
}

/// A persisted memory, as returned by every read path.
///
/// Only `last_accessed_at` and the embedding (held separately) change after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: MemoryId,
    pub user_id: Option<String>,
    pub topic: String,
    pub fact: String,
    pub source_session: Option<String>,
    pub source_channel: Option<String>,
    pub importance: i64,
    pub created_at: String,
    pub last_accessed_at: Option<String>,
}

/// A lexical search match with the native full-text rank (more negative is better).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LexicalHit {
    #[serde(flatten)]
    pub memory: MemoryRecord,
    pub rank: f64,
}

/// A memory together with its serialized embedding bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedMemory {
    pub memory: MemoryRecord,
    pub embedding: Vec<u8>,
}

/// A session rollup to be written once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSummary {
    pub session_id: String,
    pub channel: Option<String>,
    pub user_id: Option<String>,
    pub summary: String,
    pub message_count: i64,
}

/// Aggregate counts reported by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_memories: u64,
    pub total_summaries: u64,
    pub unique_users: u64,
    pub unique_topics: u64,
}

// --- Provider types ---

/// A single chat message sent to a language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A request to a language model provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A completed response from a language model provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    /// Text content with any reasoning blocks removed.
    pub content: String,
    pub model: String,
}

// --- Embedding types ---

/// Input for an embedding adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Output from an embedding adapter, one vector per input text.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}
