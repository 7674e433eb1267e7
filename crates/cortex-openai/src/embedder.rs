// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter for an HTTP embedding service.
//!
//! Sends `{"input": text}` and reads an OpenAI-style
//! `{"data": [{"embedding": [...]}]}` response, one request per text.

use std::time::Duration;

use async_trait::async_trait;
use cortex_config::model::EmbeddingsConfig;
use cortex_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};
use cortex_core::{CortexError, EmbeddingAdapter, PluginAdapter};
use tracing::debug;

use crate::types::{EmbeddingRequest, EmbeddingResponse};

/// Embedding service client implementing [`EmbeddingAdapter`].
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    url: String,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingsConfig) -> Result<Self, CortexError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CortexError::Embedding {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    /// Embeds one text. Empty text and an empty or missing vector are errors.
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>, CortexError> {
        if text.trim().is_empty() {
            return Err(CortexError::embedding("cannot embed empty text"));
        }

        let response = self
            .client
            .post(&self.url)
            .json(&EmbeddingRequest { input: text })
            .send()
            .await
            .map_err(|e| CortexError::Embedding {
                message: format!("embedding request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CortexError::embedding(format!(
                "embedding service returned {status}: {body}"
            )));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| CortexError::Embedding {
            message: format!("failed to parse embedding response: {e}"),
            source: Some(Box::new(e)),
        })?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CortexError::embedding("embedding service returned no vector"))?;
        debug!(dimensions = vector.len(), "embedding received");
        Ok(vector)
    }
}

#[async_trait]
impl PluginAdapter for HttpEmbedder {
    fn name(&self) -> &str {
        "http-embedder"
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
        debug!("embedding client shutting down");
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for HttpEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, CortexError> {
        let mut embeddings = Vec::with_capacity(input.texts.len());
        for text in &input.texts {
            embeddings.push(self.embed_text(text).await?);
        }
        let dimensions = embeddings.first().map_or(0, Vec::len);
        Ok(EmbeddingOutput {
            embeddings,
            dimensions,
        })
    }
}
