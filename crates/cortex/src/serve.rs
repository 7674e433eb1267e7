// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cortex serve` command implementation.
//!
//! Opens the store, builds the model and embedding clients, and serves the
//! HTTP API until SIGINT or SIGTERM. Shutdown order: stop accepting
//! requests, cancel pending debounced ingestions, wait for running ones,
//! then checkpoint the database.

use std::sync::Arc;

use cortex_config::CortexConfig;
use cortex_core::{CortexError, PluginAdapter};
use cortex_gateway::AppState;
use cortex_memory::DebounceScheduler;
use cortex_openai::{HttpEmbedder, OpenAiProvider};
use cortex_prometheus::PrometheusAdapter;
use cortex_storage::SqliteStorage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs the `cortex serve` command.
pub async fn run_serve(config: CortexConfig) -> Result<(), CortexError> {
    info!(version = env!("CARGO_PKG_VERSION"), "starting cortex serve");

    let storage = Arc::new(SqliteStorage::open(&config.storage).await?);
    info!(path = %config.storage.database_path, "memory store opened");

    let provider = Arc::new(OpenAiProvider::new(&config.model)?);
    let embedder = Arc::new(HttpEmbedder::new(&config.embeddings)?);

    let prometheus = if config.prometheus.enabled {
        Some(PrometheusAdapter::new()?)
    } else {
        debug!("prometheus metrics disabled");
        None
    };

    let scheduler = DebounceScheduler::new();
    let state = AppState::new(
        config.clone(),
        storage.clone(),
        embedder,
        provider,
        scheduler.clone(),
        prometheus,
    );

    let cancel = install_signal_handler();
    let result = cortex_gateway::serve(&config.server, state, cancel.clone()).await;
    // A bind failure returns before any signal; stop the handler task too.
    cancel.cancel();

    scheduler.shutdown().await;
    if let Err(e) = storage.shutdown().await {
        warn!(error = %e, "failed to checkpoint database on shutdown");
    }

    info!("cortex stopped");
    result
}

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => {}
            _ = token_clone.cancelled() => return,
        }
        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!(error = %e, "failed to install SIGTERM handler, listening for Ctrl+C only");
            let _ = tokio::signal::ctrl_c().await;
            info!("received SIGINT (Ctrl+C), initiating shutdown");
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received SIGINT (Ctrl+C), initiating shutdown");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, initiating shutdown");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("received Ctrl+C, initiating shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signal_handler_token_starts_uncancelled() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn serve_fails_when_port_is_taken() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let dir = tempfile::tempdir().unwrap();
        let mut config = CortexConfig::default();
        config.server.port = port;
        config.storage.database_path = dir.path().join("memories.db").to_string_lossy().to_string();

        let result = run_serve(config).await;
        assert!(result.is_err());
        drop(listener);
    }
}
