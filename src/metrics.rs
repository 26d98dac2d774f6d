//! Performance metrics collection and monitoring
//!
//! Counters and timings for capture sessions, recorded through the
//! `metrics` facade. `install_prometheus` wires up the exporter when the
//! service is started with a metrics port; without it the macros are
//! no-ops.

use metrics::{histogram, increment_counter};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tracing::info;

pub fn record_capture_success(duration: Duration) {
    increment_counter!("screenshot_captures_total");
    histogram!("screenshot_capture_duration_seconds", duration.as_secs_f64());
}

pub fn record_capture_failure(code: &'static str) {
    increment_counter!("screenshot_capture_failures_total", "code" => code);
}

pub fn record_capture_aborted() {
    increment_counter!("screenshot_captures_aborted_total");
}

/// Start the Prometheus exporter on the loopback interface.
pub fn install_prometheus(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    info!("prometheus exporter listening on {addr}");
    Ok(())
}
