//! Telemetry module
//!
//! Structured logging and Prometheus metrics

mod logging;
mod metrics;

pub use logging::init_logging;
pub use metrics::{
    record_fill, record_gate_rejection, record_job_duration, record_order_placed,
    record_reconcile_drift, set_ledger_gauges, Job,
};

use crate::config::TelemetryConfig;
use std::net::{Ipv4Addr, SocketAddr};

/// Guard that keeps telemetry alive for the process lifetime
pub struct TelemetryGuard {
    _priv: (),
}

/// Initialize logging and the Prometheus metrics exporter
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<TelemetryGuard> {
    init_logging(&config.log_level)?;

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.metrics_port));
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;

    tracing::info!(port = config.metrics_port, "Metrics exporter listening");

    Ok(TelemetryGuard { _priv: () })
}
