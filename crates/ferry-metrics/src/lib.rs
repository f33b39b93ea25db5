// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Consistency telemetry for the Ferry migration engine.
//!
//! [`FacadeMetrics`] implements the engine's `MetricsSink` on top of the
//! metrics-rs facade. [`PrometheusRecorder`] installs the Prometheus exporter
//! and renders the collected values as text exposition.

pub mod recording;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use ferry_core::FerryError;

pub use recording::{register_metrics, FacadeMetrics, MetricNames};

/// Process-wide Prometheus recorder.
pub struct PrometheusRecorder {
    handle: PrometheusHandle,
}

impl PrometheusRecorder {
    /// Install the Prometheus recorder globally and describe Ferry's metrics.
    ///
    /// Only one recorder can be installed per process; a second call fails.
    pub fn install(names: &MetricNames) -> Result<Self, FerryError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            FerryError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;
        register_metrics(names);
        tracing::info!("prometheus metrics recorder installed");
        Ok(Self { handle })
    }

    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
