// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording helpers for engine metrics.
//!
//! Uses the metrics-rs facade; without an installed recorder every call is a
//! no-op. Descriptions are registered by `cortex-prometheus`.

use crate::retriever::SearchSource;

pub const INGEST_RUNS: &str = "cortex_ingest_runs_total";
pub const FACTS_EXTRACTED: &str = "cortex_facts_extracted_total";
pub const FACTS_STORED: &str = "cortex_facts_stored_total";
pub const FACTS_EMBEDDED: &str = "cortex_facts_embedded_total";
pub const EMBEDDING_FAILURES: &str = "cortex_embedding_failures_total";
pub const EXTRACTION_FAILURES: &str = "cortex_extraction_failures_total";
pub const DEBOUNCE_CANCELLED: &str = "cortex_debounce_cancelled_total";
pub const SEARCHES: &str = "cortex_search_total";
pub const INGEST_DURATION: &str = "cortex_ingest_duration_seconds";

/// Record a finished ingestion run with its counts and wall time.
pub fn record_ingest(extracted: usize, stored: usize, embedded: usize, seconds: f64) {
    metrics::counter!(INGEST_RUNS).increment(1);
    metrics::counter!(FACTS_EXTRACTED).increment(extracted as u64);
    metrics::counter!(FACTS_STORED).increment(stored as u64);
    metrics::counter!(FACTS_EMBEDDED).increment(embedded as u64);
    metrics::histogram!(INGEST_DURATION).record(seconds);
}

pub fn record_extraction_failure() {
    metrics::counter!(EXTRACTION_FAILURES).increment(1);
}

pub fn record_embedding_failure() {
    metrics::counter!(EMBEDDING_FAILURES).increment(1);
}

pub fn record_debounce_cancelled() {
    metrics::counter!(DEBOUNCE_CANCELLED).increment(1);
}

/// Record a hybrid search labelled by the sources that produced scores.
pub fn record_search(source: SearchSource) {
    metrics::counter!(SEARCHES, "source" => source.as_str()).increment(1);
}
