// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait for vector embedding generation.

use async_trait::async_trait;

use crate::error::CortexError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EmbeddingInput, EmbeddingOutput};

/// Adapter for generating vector embeddings from text.
///
/// Embedding adapters power the vector half of hybrid search
/// by converting memories and queries into fixed-length vectors.
#[async_trait]
pub trait EmbeddingAdapter: PluginAdapter {
    /// Generates embeddings for the given input.
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, CortexError>;
}

/// Embeds a single text, treating empty input or an empty vector as a failure.
pub async fn embed_one(
    adapter: &(impl EmbeddingAdapter + ?Sized),
    text: &str,
) -> Result<Vec<f32>, CortexError> {
    if text.trim().is_empty() {
        return Err(CortexError::embedding("cannot embed empty text"));
    }
    let output = adapter
        .embed(EmbeddingInput {
            texts: vec![text.to_string()],
        })
        .await?;
    match output.embeddings.into_iter().next() {
        Some(vector) if !vector.is_empty() => Ok(vector),
        _ => Err(CortexError::embedding("embedding service returned no vector")),
    }
}
