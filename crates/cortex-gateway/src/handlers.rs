// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the memory API.
//!
//! Caller mistakes are rejected here with 400. Storage failures surface as
//! 500. Model and embedding failures never change the status code; they are
//! degraded inside the engine and reported in the 200 body.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use cortex_core::types::{DEFAULT_IMPORTANCE, NewMemory, StoreStats};
use cortex_core::{ConversationMessage, CortexError};
use cortex_memory::pipeline::{embed_memory, embedding_text};
use cortex_memory::timeout::{STORAGE_TIMEOUT, with_timeout};
use cortex_memory::{DebounceKey, IngestRequest, RecallResponse};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::server::AppState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// An error that maps onto an HTTP status and `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<CortexError> for ApiError {
    fn from(e: CortexError) -> Self {
        let status = match e {
            CortexError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %e, "request failed");
        }
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection, "rejected request body");
        Self::bad_request("Invalid JSON")
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        debug!(error = %rejection, "rejected query string");
        Self::bad_request("Invalid query parameters")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Treats an empty or whitespace-only string as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// --- Request bodies ---

/// Body of `POST /ingest`.
#[derive(Debug, Deserialize)]
pub struct IngestBody {
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_debounce")]
    pub debounce: bool,
}

fn default_debounce() -> bool {
    true
}

/// Body of `POST /recall`.
#[derive(Debug, Deserialize)]
pub struct RecallBody {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Body of `POST /store`.
#[derive(Debug, Deserialize)]
pub struct StoreBody {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub fact: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub importance: Option<i64>,
}

/// Query string of the search routes.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Query string of `GET /recent`.
#[derive(Debug, Deserialize)]
pub struct RecentParams {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

const SEARCH_LIMIT: usize = 20;
const RECENT_LIMIT: usize = 10;

// --- Handlers ---

/// GET /health
pub async fn get_health(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let stats = with_timeout(STORAGE_TIMEOUT, state.storage.stats()).await?;
    let timestamp = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
    Ok(Json(json!({
        "status": "ok",
        "timestamp": timestamp,
        "stats": stats,
    })))
}

/// GET /metrics
pub async fn get_metrics(State(state): State<AppState>) -> ApiResult<Response> {
    let prometheus = state
        .prometheus
        .as_ref()
        .ok_or_else(|| ApiError::not_found("metrics are disabled"))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        prometheus.render(),
    )
        .into_response())
}

/// POST /ingest
///
/// Returns immediately. Session-keyed requests are debounced so a burst of
/// turns in one conversation produces a single ingestion run.
pub async fn post_ingest(
    State(state): State<AppState>,
    body: Result<Json<IngestBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    if body.messages.is_empty() {
        return Err(ApiError::bad_request("No messages provided"));
    }

    let debounce = body.debounce;
    let request = IngestRequest {
        messages: body.messages,
        session_id: non_empty(body.session_id),
        channel: non_empty(body.channel),
        user_id: non_empty(body.user_id),
    };
    let key = request
        .session_id
        .clone()
        .map(|session_id| DebounceKey::new(session_id, request.channel.clone()));

    let pipeline = Arc::clone(&state.pipeline);
    let work = async move {
        let report = pipeline.ingest(&request).await;
        debug!(stored = report.stored, "background ingestion finished");
    };

    match key {
        Some(key) if debounce => {
            state.scheduler.trigger(key, state.debounce_delay(), work);
            Ok(Json(json!({
                "status": "debounced",
                "debounce_seconds": state.config.ingestion.debounce_seconds,
            })))
        }
        _ => {
            state.scheduler.spawn_now(work);
            Ok(Json(json!({"status": "accepted"})))
        }
    }
}

/// POST /recall
pub async fn post_recall(
    State(state): State<AppState>,
    body: Result<Json<RecallBody>, JsonRejection>,
) -> ApiResult<Json<RecallResponse>> {
    let Json(body) = body?;
    let query = body.query.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("No query provided"));
    }

    let user_id = non_empty(body.user_id);
    let response = state.recall.recall(query, user_id.as_deref()).await?;
    Ok(Json(response))
}

/// GET /search
///
/// Lexical search without synthesis, for inspection.
pub async fn get_search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params?;
    let query = required_query(params.q)?;
    let user_id = non_empty(params.user_id);
    let limit = params.limit.unwrap_or(SEARCH_LIMIT);

    let results = with_timeout(
        STORAGE_TIMEOUT,
        state
            .storage
            .search_lexical(&query, user_id.as_deref(), limit),
    )
    .await?;
    Ok(Json(json!({
        "count": results.len(),
        "results": results,
    })))
}

/// GET /hybrid-search
pub async fn get_hybrid_search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params?;
    let query = required_query(params.q)?;
    let user_id = non_empty(params.user_id);
    let limit = params.limit.unwrap_or(state.config.search.default_limit);

    let ranked = state
        .retriever
        .search(&query, user_id.as_deref(), limit)
        .await?;
    Ok(Json(json!({
        "count": ranked.results.len(),
        "results": ranked.results,
        "source": ranked.source,
    })))
}

/// GET /recent
pub async fn get_recent(
    State(state): State<AppState>,
    params: Result<Query<RecentParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params?;
    let user_id = non_empty(params.user_id);
    let limit = params.limit.unwrap_or(RECENT_LIMIT);

    let results = with_timeout(
        STORAGE_TIMEOUT,
        state.storage.recent(user_id.as_deref(), limit),
    )
    .await?;
    Ok(Json(json!({
        "count": results.len(),
        "results": results,
    })))
}

/// POST /store
///
/// Stores one memory directly and embeds it. An embedding failure leaves the
/// memory stored and is reported as `"embedded": false`.
pub async fn post_store(
    State(state): State<AppState>,
    body: Result<Json<StoreBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    let topic = body.topic.trim();
    let fact = body.fact.trim();
    if topic.is_empty() || fact.is_empty() {
        return Err(ApiError::bad_request("Both 'fact' and 'topic' are required"));
    }

    let memory = NewMemory {
        user_id: non_empty(body.user_id),
        topic: topic.to_string(),
        fact: fact.to_string(),
        source_session: None,
        source_channel: None,
        importance: body.importance.unwrap_or(DEFAULT_IMPORTANCE).clamp(1, 10),
    };

    let ids = with_timeout(
        STORAGE_TIMEOUT,
        state.storage.insert_memories(std::slice::from_ref(&memory)),
    )
    .await?;
    let id = ids
        .first()
        .copied()
        .ok_or_else(|| CortexError::Internal("store returned no id for inserted memory".into()))?;

    let embedded = match embed_memory(
        state.storage.as_ref(),
        state.embedder.as_ref(),
        id,
        &embedding_text(topic, fact),
        state.embedding_timeout(),
    )
    .await
    {
        Ok(()) => true,
        Err(e) => {
            warn!(memory_id = id, error = %e, "failed to embed stored memory");
            cortex_memory::metrics::record_embedding_failure();
            false
        }
    };

    info!(memory_id = id, embedded, "memory stored");
    Ok(Json(json!({
        "status": "stored",
        "id": id,
        "embedded": embedded,
    })))
}

/// GET /stats
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<StoreStats>> {
    let stats = with_timeout(STORAGE_TIMEOUT, state.storage.stats()).await?;
    Ok(Json(stats))
}

fn required_query(q: Option<String>) -> ApiResult<String> {
    q.map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("No query (q) provided"))
}
