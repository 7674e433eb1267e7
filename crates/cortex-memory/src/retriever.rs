// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hybrid retriever combining full-text rank and vector similarity.
//!
//! Lexical ranks are min-max normalized so the best match scores 1.0, and
//! cosine similarities are rescaled from `[-1, 1]` to `[0, 1]`. The two are
//! combined with a weighted sum. When no vector score is available the
//! result is ranked by the lexical score alone and labelled accordingly.
//!
//! Ties keep the order in which ids were first seen (lexical results
//! first); no secondary key is applied.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cortex_config::model::SearchConfig;
use cortex_core::types::LexicalHit;
use cortex_core::{
    CortexError, EmbeddingAdapter, MemoryId, MemoryRecord, StorageAdapter, embed_one,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::codec::{cosine_similarity, deserialize};
use crate::metrics;
use crate::timeout::{STORAGE_TIMEOUT, with_timeout};

/// Weights applied to the normalized lexical and vector scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub lexical: f64,
    pub vector: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            lexical: 0.4,
            vector: 0.6,
        }
    }
}

impl From<&SearchConfig> for FusionWeights {
    fn from(config: &SearchConfig) -> Self {
        Self {
            lexical: config.lexical_weight,
            vector: config.vector_weight,
        }
    }
}

/// Which scorers contributed to a ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SearchSource {
    #[serde(rename = "lexical")]
    Lexical,
    #[serde(rename = "lexical+vector")]
    LexicalVector,
}

impl SearchSource {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchSource::Lexical => "lexical",
            SearchSource::LexicalVector => "lexical+vector",
        }
    }
}

/// Per-id scores produced by [`fuse`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub id: MemoryId,
    /// Normalized lexical score, if the id was a lexical match.
    pub lexical: Option<f64>,
    /// Rescaled similarity, if the id had a comparable embedding.
    pub vector: Option<f64>,
    pub fused: f64,
}

/// A memory with its fused score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedMemory {
    #[serde(flatten)]
    pub memory: MemoryRecord,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_score: Option<f64>,
}

/// Ranked results plus the label for the whole response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridResults {
    pub results: Vec<RankedMemory>,
    pub source: SearchSource,
}

/// Min-max normalizes native full-text ranks, where lower is better.
///
/// The best rank maps to 1.0 and the worst to 0.0. If every rank is equal
/// each item scores 1.0.
pub fn normalize_lexical(ranks: &[f64]) -> Vec<f64> {
    let best = ranks.iter().copied().fold(f64::INFINITY, f64::min);
    let worst = ranks.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = worst - best;
    if !range.is_finite() || range <= 0.0 {
        return vec![1.0; ranks.len()];
    }
    ranks.iter().map(|r| (worst - r) / range).collect()
}

/// Maps a cosine similarity from `[-1, 1]` to `[0, 1]`.
pub fn rescale_similarity(similarity: f32) -> f64 {
    (f64::from(similarity) + 1.0) / 2.0
}

/// Fuses normalized lexical scores with rescaled vector scores.
///
/// With no vector scores the fused score equals the lexical score. Otherwise
/// a side missing for an id contributes 0.0. The output is sorted by fused
/// score, descending, with a stable sort over first-seen order.
pub fn fuse(
    lexical: &[(MemoryId, f64)],
    vector: &[(MemoryId, f64)],
    weights: FusionWeights,
) -> (Vec<ScoreRecord>, SearchSource) {
    let mut records: Vec<ScoreRecord> = Vec::with_capacity(lexical.len() + vector.len());
    let mut index: HashMap<MemoryId, usize> = HashMap::new();

    for &(id, score) in lexical {
        index.entry(id).or_insert_with(|| {
            records.push(ScoreRecord {
                id,
                lexical: Some(score),
                vector: None,
                fused: 0.0,
            });
            records.len() - 1
        });
    }
    for &(id, score) in vector {
        let slot = *index.entry(id).or_insert_with(|| {
            records.push(ScoreRecord {
                id,
                lexical: None,
                vector: None,
                fused: 0.0,
            });
            records.len() - 1
        });
        records[slot].vector = Some(score);
    }

    let source = if vector.is_empty() {
        SearchSource::Lexical
    } else {
        SearchSource::LexicalVector
    };
    for record in &mut records {
        let lexical = record.lexical.unwrap_or(0.0);
        record.fused = match source {
            SearchSource::Lexical => lexical,
            SearchSource::LexicalVector => {
                weights.lexical * lexical + weights.vector * record.vector.unwrap_or(0.0)
            }
        };
    }

    records.sort_by(|a, b| b.fused.total_cmp(&a.fused));
    (records, source)
}

/// Runs lexical and vector search and fuses them.
pub struct HybridRetriever {
    storage: Arc<dyn StorageAdapter>,
    embedder: Arc<dyn EmbeddingAdapter>,
    weights: FusionWeights,
    vector_candidates: usize,
    embedding_timeout: Duration,
}

impl HybridRetriever {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        embedder: Arc<dyn EmbeddingAdapter>,
        config: &SearchConfig,
        embedding_timeout: Duration,
    ) -> Self {
        Self {
            storage,
            embedder,
            weights: FusionWeights::from(config),
            vector_candidates: config.vector_candidates,
            embedding_timeout,
        }
    }

    /// Searches for `query`, returning at most `limit` ranked memories.
    ///
    /// Lexical search failures are returned as errors. Any failure on the
    /// vector side degrades the response to lexical-only.
    pub async fn search(
        &self,
        query: &str,
        user_id: Option<&str>,
        limit: usize,
    ) -> Result<HybridResults, CortexError> {
        let hits = with_timeout(
            STORAGE_TIMEOUT,
            self.storage
                .search_lexical(query, user_id, limit.saturating_mul(2)),
        )
        .await?;

        let vector = match self.vector_scores(query, user_id).await {
            Ok(scores) => scores,
            Err(e) => {
                warn!(error = %e, "vector search unavailable, ranking by lexical score only");
                Vec::new()
            }
        };

        let results = self.rank(hits, vector, limit);
        metrics::record_search(results.source);
        debug!(
            count = results.results.len(),
            source = results.source.as_str(),
            "hybrid search complete"
        );
        Ok(results)
    }

    fn rank(
        &self,
        hits: Vec<LexicalHit>,
        vector: Vec<(MemoryRecord, f64)>,
        limit: usize,
    ) -> HybridResults {
        let ranks: Vec<f64> = hits.iter().map(|h| h.rank).collect();
        let lexical: Vec<(MemoryId, f64)> = hits
            .iter()
            .map(|h| h.memory.id)
            .zip(normalize_lexical(&ranks))
            .collect();
        let vector_scores: Vec<(MemoryId, f64)> =
            vector.iter().map(|(m, s)| (m.id, *s)).collect();

        let (scored, source) = fuse(&lexical, &vector_scores, self.weights);

        // Lexical rows carry the refreshed last_accessed_at, so they win.
        let mut memories: HashMap<MemoryId, MemoryRecord> =
            vector.into_iter().map(|(m, _)| (m.id, m)).collect();
        memories.extend(hits.into_iter().map(|h| (h.memory.id, h.memory)));

        let results = scored
            .into_iter()
            .filter_map(|record| {
                memories.remove(&record.id).map(|memory| RankedMemory {
                    memory,
                    score: record.fused,
                    lexical_score: record.lexical,
                    vector_score: record.vector,
                })
            })
            .take(limit)
            .collect();

        HybridResults { results, source }
    }

    /// Scores stored embeddings against the query embedding.
    ///
    /// Undecodable payloads and dimension mismatches are skipped with a
    /// warning, which leaves that memory's vector component at zero.
    async fn vector_scores(
        &self,
        query: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<(MemoryRecord, f64)>, CortexError> {
        let query_vector = with_timeout(
            self.embedding_timeout,
            embed_one(self.embedder.as_ref(), query),
        )
        .await?;

        let candidates = with_timeout(
            STORAGE_TIMEOUT,
            self.storage.with_embeddings(user_id, self.vector_candidates),
        )
        .await?;

        let mut scores = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let id = candidate.memory.id;
            let stored = match deserialize(&candidate.embedding) {
                Ok(v) => v,
                Err(e) => {
                    warn!(memory_id = id, error = %e, "skipping undecodable embedding");
                    continue;
                }
            };
            // A dimension mismatch scores 0.0 and stays in the vector set.
            let similarity = cosine_similarity(&query_vector, &stored);
            scores.push((candidate.memory, rescale_similarity(similarity)));
        }
        Ok(scores)
    }
}
