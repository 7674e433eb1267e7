// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Cortex memory service.

use thiserror::Error;

/// The primary error type used across all Cortex adapter traits and core operations.
#[derive(Debug, Error)]
pub enum CortexError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Language model errors (HTTP failure, unexpected response shape).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Embedding service errors, including an empty or missing vector.
    #[error("embedding error: {message}")]
    Embedding {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A persisted binary payload did not match its declared layout.
    #[error("decode error: {0}")]
    Decode(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Caller supplied input that cannot be processed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CortexError {
    /// Builds a provider error without an underlying source.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Builds an embedding error without an underlying source.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
            source: None,
        }
    }
}
