// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics adapter for Tusk.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. Pipeline crates
//! record through [`recording`]; the binary installs the recorder and either
//! serves the text exposition format on a listener or renders it on demand.

pub mod recording;

use std::net::SocketAddr;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use tusk_core::{AdapterType, HealthStatus, PluginAdapter, TuskError};

pub use recording::{
    Outcome, record_delivery, record_handler_duration, record_processed, record_pushed,
    register_metrics, set_queue_depth,
};

/// Installs the Prometheus recorder and exposes a handle for rendering.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Install the recorder globally. Only one recorder can be installed per
    /// process; a second call returns an error.
    pub fn new() -> Result<Self, TuskError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            TuskError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();
        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Install the recorder and serve `GET /metrics` style scrapes on `addr`
    /// for as long as the runtime lives. Must be called inside a tokio runtime.
    pub fn with_listener(addr: SocketAddr) -> Result<Self, TuskError> {
        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(addr)
            .build()
            .map_err(|e| TuskError::Internal(format!("failed to build Prometheus exporter: {e}")))?;
        let handle = recorder.handle();
        metrics::set_global_recorder(recorder).map_err(|e| {
            TuskError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();
        tokio::spawn(async move {
            if let Err(e) = exporter.await {
                tracing::warn!(error = ?e, "prometheus listener stopped");
            }
        });
        tracing::info!(%addr, "serving prometheus metrics");

        Ok(Self { handle })
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

    async fn health_check(&self) -> Result<HealthStatus, TuskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TuskError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The only test that installs the global recorder.
    #[tokio::test]
    async fn adapter_installs_once_and_renders() {
        let adapter = PrometheusAdapter::new().unwrap();
        assert_eq!(adapter.name(), "prometheus");
        assert_eq!(adapter.adapter_type(), AdapterType::Observability);
        assert_eq!(adapter.health_check().await.unwrap(), HealthStatus::Healthy);

        record_processed(Outcome::Completed);
        assert!(adapter.render().contains("tusk_messages_processed_total"));

        assert!(PrometheusAdapter::new().is_err(), "second install must fail");
    }
}
