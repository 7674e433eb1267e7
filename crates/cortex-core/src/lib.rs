// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Cortex memory service.
//!
//! This crate provides the trait definitions, error type, and common types
//! shared by the store, the model clients, and the memory engine. Every
//! external collaborator of the engine is reached through a trait defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CortexError;
pub use types::{AdapterType, ConversationMessage, HealthStatus, MemoryId, MemoryRecord};

// Re-export all adapter traits at crate root.
pub use traits::{EmbeddingAdapter, PluginAdapter, ProviderAdapter, StorageAdapter, embed_one};
