// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory recall: lexical search with a recency fallback, then synthesis.

use std::sync::Arc;
use std::time::Duration;

use cortex_config::model::{ModelConfig, RecallConfig};
use cortex_core::types::{ChatMessage, ProviderRequest};
use cortex_core::{CortexError, MemoryRecord, ProviderAdapter, StorageAdapter};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::timeout::{STORAGE_TIMEOUT, with_timeout};

/// Reply returned when neither search nor recency finds anything.
pub const NO_MEMORIES_RESPONSE: &str = "No memories found for this query.";

/// System prompt for answer synthesis.
pub const SYNTHESIS_PROMPT: &str = "You are a memory recall assistant. You receive a query and a set of stored memories about one or more users. Write a clear answer to the query using only those memories.

Rules:
- Use only memories that are directly relevant to the query
- When memories contradict each other, trust the most recent one
- If no memory is relevant, say so plainly
- Be brief and factual; another AI will read your answer as context
- Never add information that is not in the memories
- Mention the user_id whenever you refer to a specific user's information

Answer in plain text, not JSON. /no_think";

/// Result of a recall request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecallResponse {
    pub response: String,
    pub memories_searched: usize,
    pub memories_used: usize,
}

/// Renders memories as numbered, dated, attributed lines.
pub fn format_memories(memories: &[MemoryRecord]) -> String {
    memories
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let date = m.created_at.get(..10).unwrap_or("unknown");
            format!(
                "{}. [{}] (user: {}, topic: {}, importance: {}) {}",
                i + 1,
                date,
                m.user_id.as_deref().unwrap_or("unknown"),
                m.topic,
                m.importance,
                m.fact
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn synthesis_message(query: &str, memory_text: &str) -> String {
    format!(
        "Query: {query}\n\nStored memories:\n{memory_text}\n\nBased on these memories, provide a relevant response to the query."
    )
}

/// Orchestrates recall against the store and the synthesis model.
pub struct RecallEngine {
    storage: Arc<dyn StorageAdapter>,
    provider: Arc<dyn ProviderAdapter>,
    top_k: usize,
    max_results: usize,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl RecallEngine {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        provider: Arc<dyn ProviderAdapter>,
        recall: &RecallConfig,
        model: &ModelConfig,
    ) -> Self {
        Self {
            storage,
            provider,
            top_k: recall.top_k,
            max_results: recall.max_results,
            max_tokens: recall.max_synthesis_tokens,
            temperature: model.synthesis_temperature,
            timeout: Duration::from_secs(model.timeout_secs),
        }
    }

    /// Answers `query` from stored memories.
    ///
    /// Storage errors are returned. Synthesis failures become a visible
    /// error string in the response.
    pub async fn recall(
        &self,
        query: &str,
        user_id: Option<&str>,
    ) -> Result<RecallResponse, CortexError> {
        let mut memories: Vec<MemoryRecord> = with_timeout(
            STORAGE_TIMEOUT,
            self.storage.search_lexical(query, user_id, self.max_results),
        )
        .await?
        .into_iter()
        .map(|hit| hit.memory)
        .collect();

        if memories.is_empty() {
            debug!(user_id, "no lexical matches, falling back to recent memories");
            memories = with_timeout(STORAGE_TIMEOUT, self.storage.recent(user_id, self.top_k)).await?;
        }

        if memories.is_empty() {
            return Ok(RecallResponse {
                response: NO_MEMORIES_RESPONSE.to_string(),
                memories_searched: 0,
                memories_used: 0,
            });
        }

        let searched = memories.len();
        memories.truncate(self.top_k);
        let used = memories.len();

        let response = match self.synthesize(query, &format_memories(&memories)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "synthesis failed");
                format!("Error recalling memories: {e}")
            }
        };
        info!(searched, used, "recall complete");

        Ok(RecallResponse {
            response,
            memories_searched: searched,
            memories_used: used,
        })
    }

    async fn synthesize(&self, query: &str, memory_text: &str) -> Result<String, CortexError> {
        let request = ProviderRequest {
            messages: vec![
                ChatMessage::system(SYNTHESIS_PROMPT),
                ChatMessage::user(synthesis_message(query, memory_text)),
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        let response = with_timeout(self.timeout, self.provider.complete(request)).await?;
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::types::NewMemory;
    use cortex_storage::SqliteStorage;
    use cortex_test_utils::MockProvider;

    fn record(id: i64, user: Option<&str>, topic: &str, fact: &str) -> MemoryRecord {
        MemoryRecord {
            id,
            user_id: user.map(str::to_string),
            topic: topic.to_string(),
            fact: fact.to_string(),
            source_session: None,
            source_channel: None,
            importance: 7,
            created_at: "2026-03-14T09:26:53.589Z".to_string(),
            last_accessed_at: None,
        }
    }

    fn new_memory(user: &str, topic: &str, fact: &str) -> NewMemory {
        NewMemory {
            user_id: Some(user.to_string()),
            topic: topic.to_string(),
            fact: fact.to_string(),
            source_session: Some("s1".to_string()),
            source_channel: None,
            importance: 5,
        }
    }

    fn engine(storage: Arc<SqliteStorage>, provider: Arc<MockProvider>, top_k: usize) -> RecallEngine {
        let recall = RecallConfig {
            top_k,
            ..RecallConfig::default()
        };
        RecallEngine::new(storage, provider, &recall, &ModelConfig::default())
    }

    #[test]
    fn formats_numbered_dated_lines() {
        let text = format_memories(&[
            record(1, Some("u1"), "preferences", "Likes green tea"),
            record(2, None, "travel", "Visited Kyoto in spring"),
        ]);
        assert_eq!(
            text,
            "1. [2026-03-14] (user: u1, topic: preferences, importance: 7) Likes green tea\n\
             2. [2026-03-14] (user: unknown, topic: travel, importance: 7) Visited Kyoto in spring"
        );
    }

    #[tokio::test]
    async fn empty_store_returns_canned_reply_without_synthesis() {
        let storage = Arc::new(SqliteStorage::open_in_memory().await.unwrap());
        let provider = Arc::new(MockProvider::with_responses(vec!["unused".to_string()]));
        let engine = engine(storage, provider.clone(), 8);

        let result = engine.recall("favorite color", Some("u1")).await.unwrap();
        assert_eq!(
            result,
            RecallResponse {
                response: NO_MEMORIES_RESPONSE.to_string(),
                memories_searched: 0,
                memories_used: 0,
            }
        );
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn lexical_hits_are_synthesized() {
        let storage = Arc::new(SqliteStorage::open_in_memory().await.unwrap());
        storage
            .insert_memories(&[
                new_memory("u1", "preferences", "Favorite color is teal"),
                new_memory("u1", "pets", "Has two cats"),
            ])
            .await
            .unwrap();
        let provider = Arc::new(MockProvider::with_responses(vec![
            "u1's favorite color is teal.".to_string(),
        ]));
        let engine = engine(storage, provider.clone(), 8);

        let result = engine.recall("favorite color", Some("u1")).await.unwrap();
        assert_eq!(result.response, "u1's favorite color is teal.");
        assert_eq!(result.memories_searched, 1);
        assert_eq!(result.memories_used, 1);

        let requests = provider.requests();
        assert_eq!(requests[0].messages[0].content, SYNTHESIS_PROMPT);
        let user = &requests[0].messages[1].content;
        assert!(user.starts_with("Query: favorite color\n\nStored memories:\n1. ["));
        assert!(user.contains("(user: u1, topic: preferences, importance: 5) Favorite color is teal"));
        assert!((requests[0].temperature - 0.3).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn falls_back_to_recent_and_caps_at_top_k() {
        let storage = Arc::new(SqliteStorage::open_in_memory().await.unwrap());
        storage
            .insert_memories(&[
                new_memory("u1", "work", "Leads the data platform team"),
                new_memory("u1", "hobbies", "Climbs on weekends"),
                new_memory("u1", "food", "Allergic to peanuts"),
            ])
            .await
            .unwrap();
        let provider = Arc::new(MockProvider::with_responses(vec!["summary".to_string()]));
        let engine = engine(storage, provider.clone(), 2);

        let result = engine.recall("zebra migration", Some("u1")).await.unwrap();
        assert_eq!(result.memories_searched, 2);
        assert_eq!(result.memories_used, 2);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn synthesis_failure_is_reported_in_response() {
        let storage = Arc::new(SqliteStorage::open_in_memory().await.unwrap());
        storage
            .insert_memories(&[new_memory("u1", "pets", "Has two cats")])
            .await
            .unwrap();
        let provider = Arc::new(MockProvider::failing("connection refused"));
        let engine = engine(storage, provider, 8);

        let result = engine.recall("cats", None).await.unwrap();
        assert!(result.response.starts_with("Error recalling memories: "));
        assert!(result.response.contains("connection refused"));
        assert_eq!(result.memories_used, 1);
    }
}
