// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Cortex memory service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Cortex configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CortexConfig {
    /// HTTP listener and logging settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Chat-completion model used for extraction and synthesis.
    #[serde(default)]
    pub model: ModelConfig,

    /// Embedding service settings.
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    /// Chunking and debounce settings for ingestion.
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Recall settings.
    #[serde(default)]
    pub recall: RecallConfig,

    /// Hybrid search fusion settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Prometheus metrics exporter settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind the HTTP server to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8100
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("cortex").join("memories.db").display().to_string())
        .unwrap_or_else(|| "memories.db".to_string())
}

fn default_true() -> bool {
    true
}

/// OpenAI-compatible chat-completion endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Base URL of the API; `/chat/completions` is appended.
    #[serde(default = "default_model_base_url")]
    pub base_url: String,

    /// Model name sent with every request.
    #[serde(default = "default_model_name")]
    pub model: String,

    /// Bearer token. `None` sends no Authorization header.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Token cap for fact extraction responses.
    #[serde(default = "default_extraction_max_tokens")]
    pub extraction_max_tokens: u32,

    /// Sampling temperature for fact extraction.
    #[serde(default = "default_extraction_temperature")]
    pub extraction_temperature: f32,

    /// Sampling temperature for recall synthesis.
    #[serde(default = "default_synthesis_temperature")]
    pub synthesis_temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_model_base_url(),
            model: default_model_name(),
            api_key: None,
            extraction_max_tokens: default_extraction_max_tokens(),
            extraction_temperature: default_extraction_temperature(),
            synthesis_temperature: default_synthesis_temperature(),
            timeout_secs: default_model_timeout_secs(),
        }
    }
}

fn default_model_base_url() -> String {
    "http://localhost:8080/v1".to_string()
}

fn default_model_name() -> String {
    "memory".to_string()
}

fn default_extraction_max_tokens() -> u32 {
    2048
}

fn default_extraction_temperature() -> f32 {
    0.1
}

fn default_synthesis_temperature() -> f32 {
    0.3
}

fn default_model_timeout_secs() -> u64 {
    120
}

/// Embedding service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingsConfig {
    /// Full URL of the embedding endpoint.
    #[serde(default = "default_embeddings_url")]
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_embeddings_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            url: default_embeddings_url(),
            timeout_secs: default_embeddings_timeout_secs(),
        }
    }
}

fn default_embeddings_url() -> String {
    "http://localhost:8105/embed".to_string()
}

fn default_embeddings_timeout_secs() -> u64 {
    30
}

/// Ingestion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestionConfig {
    /// Target chunk size in approximate tokens.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap carried between chunks, in approximate tokens.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Quiet period before a debounced ingestion runs.
    #[serde(default = "default_debounce_seconds")]
    pub debounce_seconds: f64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            debounce_seconds: default_debounce_seconds(),
        }
    }
}

fn default_chunk_size() -> usize {
    2048
}

fn default_chunk_overlap() -> usize {
    256
}

fn default_debounce_seconds() -> f64 {
    10.0
}

/// Recall configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecallConfig {
    /// Number of memories handed to synthesis.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Cap on lexical search results considered.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Token cap for the synthesized answer.
    #[serde(default = "default_max_synthesis_tokens")]
    pub max_synthesis_tokens: u32,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_results: default_max_results(),
            max_synthesis_tokens: default_max_synthesis_tokens(),
        }
    }
}

fn default_top_k() -> usize {
    8
}

fn default_max_results() -> usize {
    20
}

fn default_max_synthesis_tokens() -> u32 {
    1024
}

/// Hybrid search configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Weight of the normalized lexical score.
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f64,

    /// Weight of the rescaled vector similarity.
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f64,

    /// Maximum stored embeddings compared against a query.
    #[serde(default = "default_vector_candidates")]
    pub vector_candidates: usize,

    /// Result count when a request does not specify one.
    #[serde(default = "default_search_limit")]
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            lexical_weight: default_lexical_weight(),
            vector_weight: default_vector_weight(),
            vector_candidates: default_vector_candidates(),
            default_limit: default_search_limit(),
        }
    }
}

fn default_lexical_weight() -> f64 {
    0.4
}

fn default_vector_weight() -> f64 {
    0.6
}

fn default_vector_candidates() -> usize {
    500
}

fn default_search_limit() -> usize {
    10
}

/// Prometheus metrics exporter configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    /// Whether to install the Prometheus recorder and serve `/metrics`.
    #[serde(default)]
    pub enabled: bool,
}
