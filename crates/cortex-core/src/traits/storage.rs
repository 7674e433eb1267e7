// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the memory store.

use async_trait::async_trait;

use crate::error::CortexError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    EmbeddedMemory, LexicalHit, MemoryId, MemoryRecord, NewMemory, NewSummary, StoreStats,
};

/// Adapter for the persistent memory store.
///
/// The store is the single source of truth for memory records and
/// serializes its own writes, including the `last_accessed_at` update
/// performed by lexical search.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Inserts a batch of memories in one transaction and returns their ids in order.
    async fn insert_memories(&self, memories: &[NewMemory]) -> Result<Vec<MemoryId>, CortexError>;

    /// Attaches serialized embedding bytes to an existing memory.
    async fn update_embedding(&self, id: MemoryId, embedding: Vec<u8>) -> Result<(), CortexError>;

    /// Full-text search matching any word of `query`, best rank first.
    ///
    /// Every returned record has its `last_accessed_at` refreshed.
    async fn search_lexical(
        &self,
        query: &str,
        user_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<LexicalHit>, CortexError>;

    /// Most recently created memories, newest first.
    async fn recent(
        &self,
        user_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, CortexError>;

    /// Memories that carry an embedding, newest first.
    async fn with_embeddings(
        &self,
        user_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EmbeddedMemory>, CortexError>;

    /// Memories that still lack an embedding, in id order.
    async fn without_embeddings(&self) -> Result<Vec<MemoryRecord>, CortexError>;

    /// Writes a session summary and returns its id.
    async fn insert_summary(&self, summary: &NewSummary) -> Result<i64, CortexError>;

    /// Aggregate counts over memories and summaries.
    async fn stats(&self) -> Result<StoreStats, CortexError>;
}
