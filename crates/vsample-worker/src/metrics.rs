//! Prometheus exporter for the queue metrics.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use crate::error::{WorkerError, WorkerResult};

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must be called from within the tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> WorkerResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::Metrics(e.to_string()))?;
    info!(%addr, "Prometheus metrics listener started");
    Ok(())
}
