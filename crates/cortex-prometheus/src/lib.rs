// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics adapter for the Cortex memory service.
//!
//! Uses the metrics-rs facade with the Prometheus exporter.
//! Metrics are rendered as Prometheus text format via the `render()` method,
//! which is exposed through the gateway's /metrics endpoint.

pub mod recording;

use async_trait::async_trait;
use cortex_core::types::{AdapterType, HealthStatus};
use cortex_core::{CortexError, PluginAdapter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub use recording::{record_request, register_metrics};

/// Prometheus metrics adapter.
///
/// Holds the exporter handle used to render the current metric values.
#[derive(Clone)]
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Installs the Prometheus recorder globally.
    ///
    /// Only one recorder can be installed per process. Returns an error if a
    /// recorder is already installed.
    pub fn new() -> Result<Self, CortexError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            CortexError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Builds a recorder without installing it, for rendering in isolation.
    pub fn detached() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        Self {
            handle: recorder.handle(),
        }
    }

    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, CortexError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CortexError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global recorder can only be installed once per process, so these
    // tests use a local recorder.

    #[test]
    fn local_recorder_renders_described_counters() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            register_metrics();
            record_request("/recall", 200);
            record_request("/recall", 200);
            cortex_memory::metrics::record_extraction_failure();
        });

        let text = handle.render();
        assert!(text.contains("cortex_http_requests_total"));
        assert!(text.contains("route=\"/recall\""));
        assert!(text.contains("cortex_extraction_failures_total 1"));
        assert!(text.contains("# HELP cortex_extraction_failures_total"));
    }

    #[test]
    fn detached_adapter_renders_empty() {
        let adapter = PrometheusAdapter::detached();
        assert!(adapter.render().trim().is_empty());
    }

    #[tokio::test]
    async fn adapter_identity() {
        let adapter = PrometheusAdapter::detached();
        assert_eq!(adapter.name(), "prometheus");
        assert_eq!(adapter.adapter_type(), AdapterType::Observability);
        assert_eq!(adapter.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
