// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat model adapter for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with pre-configured responses,
//! enabling fast, CI-runnable tests without a model server.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use cortex_core::types::{AdapterType, HealthStatus, ProviderRequest, ProviderResponse};
use cortex_core::{CortexError, PluginAdapter, ProviderAdapter};

/// Text returned once the response queue is exhausted.
pub const DEFAULT_RESPONSE: &str = "[]";

#[derive(Default)]
struct State {
    responses: VecDeque<String>,
    requests: Vec<ProviderRequest>,
}

/// A mock chat model that returns pre-configured responses.
///
/// Responses are popped from a FIFO queue. When the queue is empty,
/// [`DEFAULT_RESPONSE`] is returned. Every request is recorded.
pub struct MockProvider {
    state: Mutex<State>,
    failure: Option<String>,
}

impl MockProvider {
    /// Create a new mock provider with an empty response queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            failure: None,
        }
    }

    /// Create a mock provider pre-loaded with the given responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            state: Mutex::new(State {
                responses: VecDeque::from(responses),
                requests: Vec::new(),
            }),
            failure: None,
        }
    }

    /// Create a mock provider whose every call fails with a provider error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            failure: Some(message.into()),
        }
    }

    /// Add a response to the end of the queue.
    pub fn add_response(&self, text: impl Into<String>) {
        self.lock().responses.push_back(text.into());
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.lock().requests.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, CortexError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CortexError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, CortexError> {
        let mut state = self.lock();
        state.requests.push(request);
        if let Some(message) = &self.failure {
            return Err(CortexError::provider(message.clone()));
        }
        let content = state
            .responses
            .pop_front()
            .unwrap_or_else(|| DEFAULT_RESPONSE.to_string());
        Ok(ProviderResponse {
            content,
            model: "mock-model".to_string(),
        })
    }
}
