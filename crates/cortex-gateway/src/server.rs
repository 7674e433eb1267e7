// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware::{self as axum_middleware, Next},
    response::Response,
    routing::{get, post},
};
use cortex_config::CortexConfig;
use cortex_config::model::ServerConfig;
use cortex_core::{CortexError, EmbeddingAdapter, ProviderAdapter, StorageAdapter};
use cortex_memory::{DebounceScheduler, HybridRetriever, IngestionPipeline, RecallEngine};
use cortex_prometheus::PrometheusAdapter;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CortexConfig>,
    pub storage: Arc<dyn StorageAdapter>,
    pub embedder: Arc<dyn EmbeddingAdapter>,
    pub pipeline: Arc<IngestionPipeline>,
    /// Owned by the server process; shut down after the listener stops.
    pub scheduler: DebounceScheduler,
    pub retriever: Arc<HybridRetriever>,
    pub recall: Arc<RecallEngine>,
    /// Present only when `prometheus.enabled`.
    pub prometheus: Option<PrometheusAdapter>,
}

impl AppState {
    /// Wires the engine objects for the given collaborators.
    pub fn new(
        config: CortexConfig,
        storage: Arc<dyn StorageAdapter>,
        embedder: Arc<dyn EmbeddingAdapter>,
        provider: Arc<dyn ProviderAdapter>,
        scheduler: DebounceScheduler,
        prometheus: Option<PrometheusAdapter>,
    ) -> Self {
        let pipeline = IngestionPipeline::from_config(
            &config,
            Arc::clone(&storage),
            Arc::clone(&embedder),
            Arc::clone(&provider),
        );
        let retriever = HybridRetriever::new(
            Arc::clone(&storage),
            Arc::clone(&embedder),
            &config.search,
            Duration::from_secs(config.embeddings.timeout_secs),
        );
        let recall = RecallEngine::new(
            Arc::clone(&storage),
            provider,
            &config.recall,
            &config.model,
        );

        Self {
            config: Arc::new(config),
            storage,
            embedder,
            pipeline: Arc::new(pipeline),
            scheduler,
            retriever: Arc::new(retriever),
            recall: Arc::new(recall),
            prometheus,
        }
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.config.embeddings.timeout_secs)
    }

    /// Debounce window for session-keyed ingestion.
    pub fn debounce_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.config.ingestion.debounce_seconds).unwrap_or_default()
    }
}

/// Builds the router with every route and middleware layer.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics))
        .route("/ingest", post(handlers::post_ingest))
        .route("/recall", post(handlers::post_recall))
        .route("/search", get(handlers::get_search))
        .route("/hybrid-search", get(handlers::get_hybrid_search))
        .route("/recent", get(handlers::get_recent))
        .route("/store", post(handlers::post_store))
        .route("/stats", get(handlers::get_stats))
        .route_layer(axum_middleware::from_fn(track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Counts each routed request by matched path and status code.
async fn track_requests(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let response = next.run(request).await;
    cortex_prometheus::record_request(&route, response.status().as_u16());
    response
}

/// Binds `host:port` and serves until `shutdown` is cancelled.
///
/// In-flight requests are drained before this returns.
pub async fn serve(
    config: &ServerConfig,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), CortexError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CortexError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!(addr = %addr, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| CortexError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_test_utils::TestHarness;

    #[tokio::test]
    async fn app_state_reads_delays_from_config() {
        let harness = TestHarness::builder()
            .with_debounce_seconds(2.5)
            .build()
            .await
            .unwrap();
        let state = AppState::new(
            harness.config.clone(),
            harness.storage.clone(),
            harness.embedder.clone(),
            harness.provider.clone(),
            DebounceScheduler::new(),
            None,
        );
        assert_eq!(state.debounce_delay(), Duration::from_millis(2500));
        assert_eq!(
            state.embedding_timeout(),
            Duration::from_secs(harness.config.embeddings.timeout_secs)
        );
        let _cloned = state.clone();
    }

    #[tokio::test]
    async fn serve_stops_on_cancel() {
        let harness = TestHarness::builder().build().await.unwrap();
        let state = AppState::new(
            harness.config.clone(),
            harness.storage.clone(),
            harness.embedder.clone(),
            harness.provider.clone(),
            DebounceScheduler::new(),
            None,
        );
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            log_level: "info".into(),
        };
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        serve(&config, state, shutdown).await.unwrap();
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn immediate_ingest_runs_in_background() {
        use axum::body::Body;
        use axum::http::{Request, StatusCode, header};
        use tower::ServiceExt;

        let harness = TestHarness::builder().build().await.unwrap();
        let scheduler = DebounceScheduler::new();
        let state = AppState::new(
            harness.config.clone(),
            harness.storage.clone(),
            harness.embedder.clone(),
            harness.provider.clone(),
            scheduler.clone(),
            None,
        );

        let request = Request::builder()
            .method("POST")
            .uri("/ingest")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"messages": [{"role": "user", "content": "hello"}], "debounce": false}"#,
            ))
            .unwrap();
        let response = build_router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        scheduler.shutdown().await;
        assert_eq!(harness.provider.call_count(), 1);
        assert!(logs_contain("background ingestion finished"));
    }
}
