// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock embedding adapter producing deterministic bag-of-words vectors.
//!
//! Each lowercase word is hashed into one of `dimensions` buckets, so texts
//! that share words have a positive cosine similarity and texts that share
//! none are (barring bucket collisions) orthogonal. Components are never
//! negative.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use cortex_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};
use cortex_core::{CortexError, EmbeddingAdapter, PluginAdapter};

/// A deterministic embedder for tests.
pub struct MockEmbedder {
    dimensions: usize,
    overrides: Mutex<HashMap<String, Vec<f32>>>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            overrides: Mutex::new(HashMap::new()),
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// An embedder whose every call fails with an embedding error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(0)
        }
    }

    /// Returns `vector` for the exact text `text`.
    pub fn with_override(self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        if let Ok(mut overrides) = self.overrides.lock() {
            overrides.insert(text.into(), vector);
        }
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Vector for `text` without counting a call.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(vector) = self
            .overrides
            .lock()
            .ok()
            .and_then(|overrides| overrides.get(text).cloned())
        {
            return vector;
        }

        let mut vector = vec![0.0; self.dimensions];
        if self.dimensions == 0 {
            return vector;
        }
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = fnv1a(&word.to_lowercase()) as usize % self.dimensions;
            vector[bucket] += 1.0;
        }
        vector
    }
}

fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, CortexError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CortexError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, CortexError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(CortexError::embedding(message.clone()));
        }
        let embeddings: Vec<Vec<f32>> = input.texts.iter().map(|t| self.vector_for(t)).collect();
        let dimensions = embeddings.first().map_or(self.dimensions, Vec::len);
        Ok(EmbeddingOutput {
            embeddings,
            dimensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::embed_one;

    #[tokio::test]
    async fn vectors_are_deterministic_and_counted() {
        let embedder = MockEmbedder::new(32);
        let a = embed_one(&embedder, "Likes green tea").await.unwrap();
        let b = embed_one(&embedder, "likes GREEN tea").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert_eq!(a.iter().sum::<f32>(), 3.0);
        assert_eq!(embedder.call_count(), 2);
    }

    #[tokio::test]
    async fn overrides_take_precedence() {
        let embedder = MockEmbedder::new(4).with_override("query", vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(
            embed_one(&embedder, "query").await.unwrap(),
            vec![1.0, 0.0, 0.0, 0.0]
        );
    }

    #[tokio::test]
    async fn failing_embedder_errors() {
        let embedder = MockEmbedder::failing("offline");
        assert!(matches!(
            embed_one(&embedder, "anything").await,
            Err(CortexError::Embedding { .. })
        ));
        assert_eq!(embedder.call_count(), 1);
    }
}
