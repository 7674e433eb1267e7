// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cortex backfill` and `cortex stats` command implementations.
//!
//! Both print a JSON object on stdout.

use std::time::Duration;

use cortex_config::CortexConfig;
use cortex_core::{CortexError, PluginAdapter, StorageAdapter};
use cortex_memory::backfill_embeddings;
use cortex_openai::HttpEmbedder;
use cortex_storage::SqliteStorage;
use serde::Serialize;
use tracing::warn;

/// Embeds every stored memory that lacks an embedding.
pub async fn run_backfill(config: CortexConfig) -> Result<(), CortexError> {
    let storage = SqliteStorage::open(&config.storage).await?;
    let embedder = HttpEmbedder::new(&config.embeddings)?;

    let report = backfill_embeddings(
        &storage,
        &embedder,
        Duration::from_secs(config.embeddings.timeout_secs),
    )
    .await;

    close(&storage).await;
    print_json(&report?)
}

/// Prints aggregate store statistics.
pub async fn run_stats(config: CortexConfig) -> Result<(), CortexError> {
    let storage = SqliteStorage::open(&config.storage).await?;
    let stats = storage.stats().await;
    close(&storage).await;
    print_json(&stats?)
}

async fn close(storage: &SqliteStorage) {
    if let Err(e) = storage.shutdown().await {
        warn!(error = %e, "failed to checkpoint database");
    }
}

fn print_json(value: &impl Serialize) -> Result<(), CortexError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CortexError::Internal(format!("failed to encode output: {e}")))?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir) -> CortexConfig {
        let mut config = CortexConfig::default();
        config.storage.database_path = dir.path().join("memories.db").to_string_lossy().to_string();
        // Nothing listens here; backfill must still finish.
        config.embeddings.url = "http://127.0.0.1:9/embed".to_string();
        config.embeddings.timeout_secs = 1;
        config
    }

    #[tokio::test]
    async fn stats_on_fresh_store_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        run_stats(config_in(&dir)).await.unwrap();
        assert!(dir.path().join("memories.db").exists());
    }

    #[tokio::test]
    async fn backfill_with_nothing_missing_makes_no_requests() {
        let dir = tempfile::tempdir().unwrap();
        run_backfill(config_in(&dir)).await.unwrap();
    }

    #[test]
    fn print_json_encodes_reports() {
        print_json(&cortex_memory::BackfillReport::default()).unwrap();
    }
}
