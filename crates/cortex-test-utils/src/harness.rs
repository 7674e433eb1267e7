// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a temp-file SQLite store, a mock chat model, a
//! mock embedder, and a configuration tuned for fast tests (no debounce
//! delay). Higher layers build their engine objects from these parts.

use std::sync::Arc;

use cortex_config::CortexConfig;
use cortex_config::model::StorageConfig;
use cortex_core::CortexError;
use cortex_storage::SqliteStorage;

use crate::mock_embedder::MockEmbedder;
use crate::mock_provider::MockProvider;

/// Dimensions of the harness embedder.
pub const TEST_DIMENSIONS: usize = 64;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    failing_embedder: bool,
    debounce_seconds: f64,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            failing_embedder: false,
            debounce_seconds: 0.0,
        }
    }

    /// Set mock chat model responses.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Make every embedding call fail.
    pub fn with_failing_embedder(mut self) -> Self {
        self.failing_embedder = true;
        self
    }

    pub fn with_debounce_seconds(mut self, seconds: f64) -> Self {
        self.debounce_seconds = seconds;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, CortexError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| CortexError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = CortexConfig::default();
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };
        config.ingestion.debounce_seconds = self.debounce_seconds;

        let storage = Arc::new(SqliteStorage::open(&config.storage).await?);
        let provider = Arc::new(MockProvider::with_responses(self.responses));
        let embedder = Arc::new(if self.failing_embedder {
            MockEmbedder::failing("embedding service unavailable")
        } else {
            MockEmbedder::new(TEST_DIMENSIONS)
        });

        Ok(TestHarness {
            config,
            storage,
            provider,
            embedder,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete set of collaborators backed by a temporary database.
pub struct TestHarness {
    pub config: CortexConfig,
    pub storage: Arc<SqliteStorage>,
    pub provider: Arc<MockProvider>,
    pub embedder: Arc<MockEmbedder>,
    // Keeps the database directory alive for the harness lifetime.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }
}
