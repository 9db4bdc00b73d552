//! Prometheus metrics for the gateway
//!
//! Labels carry outcomes only, never token ids.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

pub const OUTCOME_OK: &str = "ok";
pub const OUTCOME_CLIENT_ERROR: &str = "client_error";
pub const OUTCOME_SERVER_ERROR: &str = "server_error";

pub const PROBE_MATCH: &str = "match";
pub const PROBE_MISMATCH: &str = "mismatch";
pub const PROBE_FAILED: &str = "failed";

pub fn record_token_request(outcome: &str, duration: Duration) {
    counter!("glyph_token_requests_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("glyph_token_request_duration_seconds", "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_probe(outcome: &str) {
    counter!("glyph_source_probes_total", "outcome" => outcome.to_string()).increment(1);
}

pub fn record_discovery(found: bool) {
    let status = if found { "found" } else { "not_found" };
    counter!("glyph_chain_discovery_total", "status" => status).increment(1);
}

pub fn set_chains_mapped(count: usize) {
    gauge!("glyph_chains_mapped").set(count as f64);
}

pub fn init_prometheus_recorder(
) -> Result<metrics_exporter_prometheus::PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()
}
