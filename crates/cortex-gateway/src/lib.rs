// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Cortex memory service.
//!
//! Exposes ingestion, recall, and search over JSON. The router is built from
//! an [`AppState`] holding the engine objects, so tests can drive it in
//! process with `tower::ServiceExt::oneshot`.

pub mod handlers;
pub mod server;

pub use handlers::{ApiError, ErrorResponse};
pub use server::{AppState, build_router, serve};
