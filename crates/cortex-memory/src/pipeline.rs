// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion pipeline: chunk, extract, store, embed.
//!
//! Each chunk and each stored record is an independent unit of work. A
//! failing unit is logged and counted, and the run moves on to the next one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cortex_config::CortexConfig;
use cortex_core::types::NewMemory;
use cortex_core::{
    ConversationMessage, CortexError, EmbeddingAdapter, MemoryId, ProviderAdapter, StorageAdapter,
    embed_one,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chunker::chunk_messages;
use crate::codec::serialize;
use crate::extractor::{ExtractedFact, FactExtractor};
use crate::metrics;
use crate::timeout::{STORAGE_TIMEOUT, with_timeout};

/// One conversation submitted for ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IngestRequest {
    pub messages: Vec<ConversationMessage>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    /// Overrides the user id of every extracted fact when present.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Counts aggregated over one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub chunks: usize,
    pub extracted: usize,
    pub stored: usize,
    pub embedded: usize,
}

/// Outcome of an embedding backfill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Text embedded for a memory.
pub fn embedding_text(topic: &str, fact: &str) -> String {
    format!("{topic}: {fact}")
}

/// Embeds `text` and attaches the serialized vector to memory `id`.
pub async fn embed_memory(
    storage: &dyn StorageAdapter,
    embedder: &dyn EmbeddingAdapter,
    id: MemoryId,
    text: &str,
    timeout: Duration,
) -> Result<(), CortexError> {
    let vector = with_timeout(timeout, embed_one(embedder, text)).await?;
    with_timeout(STORAGE_TIMEOUT, storage.update_embedding(id, serialize(&vector))).await
}

/// Computes embeddings for every stored memory that lacks one.
///
/// A failure on one memory is logged and counted; the run continues.
pub async fn backfill_embeddings(
    storage: &dyn StorageAdapter,
    embedder: &dyn EmbeddingAdapter,
    timeout: Duration,
) -> Result<BackfillReport, CortexError> {
    let missing = with_timeout(STORAGE_TIMEOUT, storage.without_embeddings()).await?;
    info!(count = missing.len(), "backfilling embeddings");

    let mut report = BackfillReport::default();
    for memory in &missing {
        let text = embedding_text(&memory.topic, &memory.fact);
        match embed_memory(storage, embedder, memory.id, &text, timeout).await {
            Ok(()) => report.succeeded += 1,
            Err(e) => {
                warn!(memory_id = memory.id, error = %e, "failed to backfill embedding");
                metrics::record_embedding_failure();
                report.failed += 1;
            }
        }
    }

    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        "embedding backfill complete"
    );
    Ok(report)
}

/// Orchestrates ingestion of one conversation.
pub struct IngestionPipeline {
    storage: Arc<dyn StorageAdapter>,
    embedder: Arc<dyn EmbeddingAdapter>,
    extractor: FactExtractor,
    chunk_size: usize,
    chunk_overlap: usize,
    embedding_timeout: Duration,
}

impl IngestionPipeline {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        embedder: Arc<dyn EmbeddingAdapter>,
        extractor: FactExtractor,
        chunk_size: usize,
        chunk_overlap: usize,
        embedding_timeout: Duration,
    ) -> Self {
        Self {
            storage,
            embedder,
            extractor,
            chunk_size,
            chunk_overlap,
            embedding_timeout,
        }
    }

    /// Builds a pipeline with chunking, extraction, and timeout settings from `config`.
    pub fn from_config(
        config: &CortexConfig,
        storage: Arc<dyn StorageAdapter>,
        embedder: Arc<dyn EmbeddingAdapter>,
        provider: Arc<dyn ProviderAdapter>,
    ) -> Self {
        let extractor = FactExtractor::new(
            provider,
            config.model.extraction_max_tokens,
            config.model.extraction_temperature,
            Duration::from_secs(config.model.timeout_secs),
        );
        Self::new(
            storage,
            embedder,
            extractor,
            config.ingestion.chunk_size,
            config.ingestion.chunk_overlap,
            Duration::from_secs(config.embeddings.timeout_secs),
        )
    }

    /// Runs one ingestion pass. Never fails as a whole; failed units are
    /// reflected in the counts.
    pub async fn ingest(&self, request: &IngestRequest) -> IngestReport {
        let started = Instant::now();
        let session = request.session_id.as_deref().unwrap_or("");

        let relevant: Vec<ConversationMessage> = request
            .messages
            .iter()
            .filter(|m| !m.content.is_empty())
            .cloned()
            .collect();
        if relevant.is_empty() {
            debug!(session, "nothing to ingest");
            return IngestReport::default();
        }

        let chunks = chunk_messages(&relevant, self.chunk_size, self.chunk_overlap);
        let mut report = IngestReport {
            chunks: chunks.len(),
            ..IngestReport::default()
        };

        for (index, chunk) in chunks.iter().enumerate() {
            let facts = match self.extractor.extract(chunk).await {
                Ok(facts) => facts,
                Err(e) => {
                    warn!(session, chunk = index, error = %e, "fact extraction failed");
                    metrics::record_extraction_failure();
                    continue;
                }
            };
            report.extracted += facts.len();
            if facts.is_empty() {
                continue;
            }

            let batch: Vec<NewMemory> = facts
                .into_iter()
                .map(|fact| self.to_new_memory(fact, request))
                .collect();
            let ids = match with_timeout(STORAGE_TIMEOUT, self.storage.insert_memories(&batch)).await {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(session, chunk = index, error = %e, "failed to store extracted facts");
                    continue;
                }
            };
            report.stored += ids.len();

            for (id, memory) in ids.iter().zip(&batch) {
                let text = embedding_text(&memory.topic, &memory.fact);
                match embed_memory(
                    self.storage.as_ref(),
                    self.embedder.as_ref(),
                    *id,
                    &text,
                    self.embedding_timeout,
                )
                .await
                {
                    Ok(()) => report.embedded += 1,
                    Err(e) => {
                        warn!(session, memory_id = *id, error = %e, "failed to embed memory");
                        metrics::record_embedding_failure();
                    }
                }
            }
        }

        let elapsed = started.elapsed().as_secs_f64();
        metrics::record_ingest(report.extracted, report.stored, report.embedded, elapsed);
        info!(
            session,
            chunks = report.chunks,
            extracted = report.extracted,
            stored = report.stored,
            embedded = report.embedded,
            "ingestion complete"
        );
        report
    }

    fn to_new_memory(&self, fact: ExtractedFact, request: &IngestRequest) -> NewMemory {
        NewMemory {
            user_id: request.user_id.clone().or(fact.user_id),
            topic: fact.topic,
            fact: fact.fact,
            source_session: request.session_id.clone(),
            source_channel: request.channel.clone(),
            importance: fact.importance,
        }
    }
}
