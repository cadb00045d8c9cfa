//! Metrics collection and exposition.
//!
//! # Metrics
//! - `wtf_listeners_acquired_total` (counter)
//! - `wtf_listen_failures_total` (counter)
//! - `wtf_health_probe_failures_total` (counter)
//! - `wtf_watchdog_exhausted_total` (counter)
//! - `wtf_restarts_total` (counter): persistent cycles that ended, by outcome
//!
//! Recording without an installed recorder is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_listener_acquired() {
    ::metrics::counter!("wtf_listeners_acquired_total").increment(1);
}

pub fn record_listen_failure() {
    ::metrics::counter!("wtf_listen_failures_total").increment(1);
}

pub fn record_probe_failure() {
    ::metrics::counter!("wtf_health_probe_failures_total").increment(1);
}

pub fn record_watchdog_exhausted() {
    ::metrics::counter!("wtf_watchdog_exhausted_total").increment(1);
}

pub fn record_restart(failed: bool) {
    let outcome = if failed { "error" } else { "clean" };
    ::metrics::counter!("wtf_restarts_total", "outcome" => outcome).increment(1);
}
