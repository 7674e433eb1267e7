// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for the language model used by extraction and synthesis.

use async_trait::async_trait;

use crate::error::CortexError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderResponse};

/// Adapter for chat-completion language model APIs.
///
/// The same provider serves fact extraction during ingestion and
/// answer synthesis during recall.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a completion request and returns the full response.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> Result<ProviderResponse, CortexError>;
}
