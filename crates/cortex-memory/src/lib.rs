// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory engine for the Cortex service.
//!
//! Turns chat transcripts into stored facts and answers queries from them.
//! Every collaborator (store, embedding service, chat model) is reached
//! through a `cortex-core` trait with a finite deadline.
//!
//! ## Architecture
//!
//! - **codec**: byte layout for persisted embeddings, cosine similarity
//! - **chunker**: overlapping, size-bounded windows over a conversation
//! - **FactExtractor**: chunk formatting, model call, lenient output parsing
//! - **DebounceScheduler**: per-session coalescing of ingestion triggers
//! - **IngestionPipeline**: chunk, extract, store, embed; plus embedding backfill
//! - **HybridRetriever**: lexical + vector score fusion
//! - **RecallEngine**: lexical search with recency fallback and synthesis

pub mod chunker;
pub mod codec;
pub mod debounce;
pub mod extractor;
pub mod metrics;
pub mod pipeline;
pub mod recall;
pub mod retriever;
pub mod timeout;

pub use debounce::{DebounceKey, DebounceScheduler, TaskHandle, TaskState};
pub use extractor::{ExtractedFact, FactExtractor};
pub use pipeline::{BackfillReport, IngestReport, IngestRequest, IngestionPipeline, backfill_embeddings};
pub use recall::{RecallEngine, RecallResponse};
pub use retriever::{FusionWeights, HybridResults, HybridRetriever, RankedMemory, SearchSource};
