//! Prometheus metrics for monitoring the tournament server.
//!
//! Metrics are exposed in Prometheus text format for scraping by monitoring
//! systems when `METRICS_BIND` is configured.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts and durations
//! - **Tournament Metrics**: Commands by outcome, rounds and results
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use tcg_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::tournament_operation("submit_result", "ok");
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
///
/// # Returns
///
/// Result indicating success or error message
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Tournament Metrics
// ============================================================================

/// Count a tournament command by name and outcome (`ok` or an error kind).
pub fn tournament_operation(operation: &'static str, outcome: &'static str) {
    metrics::counter!("tournament_operations_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

/// Increment rounds finished counter.
pub fn rounds_finished_total(forced: bool) {
    metrics::counter!("rounds_finished_total",
        "forced" => forced.to_string()
    )
    .increment(1);
}

/// Increment match results counter.
pub fn match_results_total() {
    metrics::counter!("match_results_total").increment(1);
}

/// Set current running tournament actors count.
pub fn active_tournaments(count: usize) {
    metrics::gauge!("active_tournaments").set(count as f64);
}
