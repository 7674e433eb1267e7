// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Cortex integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Mock chat model with pre-configured responses
//! - [`MockEmbedder`] - Deterministic bag-of-words embedder
//! - [`TestHarness`] - Temp-file store plus mocks and a test configuration

pub mod harness;
pub mod mock_embedder;
pub mod mock_provider;

pub use harness::TestHarness;
pub use mock_embedder::MockEmbedder;
pub use mock_provider::MockProvider;
