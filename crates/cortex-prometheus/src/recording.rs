// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric descriptions and HTTP request recording.
//!
//! Engine counters are recorded inside `cortex-memory`; this module only
//! describes them so the exporter emits `# HELP` lines.

use cortex_memory::metrics as engine;
use metrics::{Unit, describe_counter, describe_histogram};

pub const HTTP_REQUESTS: &str = "cortex_http_requests_total";

/// Register all Cortex metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(engine::INGEST_RUNS, "Completed ingestion runs");
    describe_counter!(engine::FACTS_EXTRACTED, "Facts returned by the extraction model");
    describe_counter!(engine::FACTS_STORED, "Facts written to the memory store");
    describe_counter!(engine::FACTS_EMBEDDED, "Stored facts that received an embedding");
    describe_counter!(engine::EMBEDDING_FAILURES, "Embedding requests that failed");
    describe_counter!(engine::EXTRACTION_FAILURES, "Chunks whose extraction failed");
    describe_counter!(engine::DEBOUNCE_CANCELLED, "Pending ingestions superseded by a newer trigger");
    describe_counter!(engine::SEARCHES, "Hybrid searches by score source");
    describe_histogram!(
        engine::INGEST_DURATION,
        Unit::Seconds,
        "Wall time of one ingestion run"
    );
    describe_counter!(HTTP_REQUESTS, "HTTP requests by route and status");
}

/// Record one handled HTTP request.
pub fn record_request(route: &str, status: u16) {
    metrics::counter!(
        HTTP_REQUESTS,
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
