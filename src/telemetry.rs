// src/telemetry.rs
//! Prometheus recorder for the `metrics` series emitted across the crate.
//!
//! Install at most once per process; without it every counter and histogram
//! goes to the no-op recorder.

use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::{AdvisorError, Result};

pub struct Telemetry {
    handle: PrometheusHandle,
}

impl Telemetry {
    /// Install the global recorder and register series descriptions.
    pub fn install() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| AdvisorError::monitor(format!("prometheus recorder: {e}")))?;

        crate::advisor::ensure_metrics_described();
        crate::search::ensure_metrics_described();
        crate::llm::openai::ensure_metrics_described();
        gauge!("advisor_build_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

        Ok(Self { handle })
    }

    pub fn handle(&self) -> PrometheusHandle {
        self.handle.clone()
    }

    /// Prometheus exposition text.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
