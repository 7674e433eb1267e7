// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the collaborators of the memory core.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod embedding;
pub mod provider;
pub mod storage;

pub use adapter::PluginAdapter;
pub use embedding::{EmbeddingAdapter, embed_one};
pub use provider::ProviderAdapter;
pub use storage::StorageAdapter;
