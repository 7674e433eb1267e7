// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tracing::debug;

use cortex_config::model::StorageConfig;
use cortex_core::types::{
    EmbeddedMemory, LexicalHit, MemoryId, MemoryRecord, NewMemory, NewSummary, StoreStats,
};
use cortex_core::{AdapterType, CortexError, HealthStatus, PluginAdapter, StorageAdapter};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed memory store.
///
/// Wraps a [`Database`] handle and delegates all operations to the
/// typed query modules.
pub struct SqliteStorage {
    db: Database,
}

impl SqliteStorage {
    /// Open the database described by `config`, running migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, CortexError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite storage initialized");
        Ok(Self { db })
    }

    /// An empty in-memory store, used by tests and tooling.
    pub async fn open_in_memory() -> Result<Self, CortexError> {
        Ok(Self {
            db: Database::open_in_memory().await?,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, CortexError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CortexError> {
        self.db.checkpoint().await
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn insert_memories(&self, memories: &[NewMemory]) -> Result<Vec<MemoryId>, CortexError> {
        queries::memories::insert_memories(&self.db, memories).await
    }

    async fn update_embedding(&self, id: MemoryId, embedding: Vec<u8>) -> Result<(), CortexError> {
        queries::memories::update_embedding(&self.db, id, embedding).await
    }

    async fn search_lexical(
        &self,
        query: &str,
        user_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<LexicalHit>, CortexError> {
        queries::memories::search_lexical(&self.db, query, user_id, limit).await
    }

    async fn recent(
        &self,
        user_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, CortexError> {
        queries::memories::recent(&self.db, user_id, limit).await
    }

    async fn with_embeddings(
        &self,
        user_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EmbeddedMemory>, CortexError> {
        queries::memories::with_embeddings(&self.db, user_id, limit).await
    }

    async fn without_embeddings(&self) -> Result<Vec<MemoryRecord>, CortexError> {
        queries::memories::without_embeddings(&self.db).await
    }

    async fn insert_summary(&self, summary: &NewSummary) -> Result<i64, CortexError> {
        queries::summaries::insert_summary(&self.db, summary).await
    }

    async fn stats(&self) -> Result<StoreStats, CortexError> {
        queries::summaries::stats(&self.db).await
    }
}
