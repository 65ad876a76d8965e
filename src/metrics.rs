//! Prometheus metrics for the dashboard API
//!
//! Exposes metrics endpoint for monitoring:
//! - Response cache hits, misses and write failures
//! - Sweep passes, removed entries and skipped attempts
//! - Current cache entry count

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::cache::SweepOutcome;

/// Metrics state
pub struct MetricsState {
    /// Prometheus registry
    registry: Registry,
    /// Cache lookups answered from disk
    pub cache_hits: IntCounter,
    /// Cache lookups that had to compute fresh data
    pub cache_misses: IntCounter,
    /// Cache writes that failed and were skipped
    pub cache_write_failures: IntCounter,
    /// Completed sweep passes
    pub sweeps: IntCounter,
    /// Entries removed by sweeps
    pub swept_entries: IntCounter,
    /// Sweep attempts that did not run, by reason
    pub sweep_skips: IntCounterVec,
    /// Entries on disk as of the last status check
    pub cache_entries: IntGauge,
}

impl MetricsState {
    /// Create a new metrics state with all metrics registered
    pub fn new() -> Self {
        let registry = Registry::new();

        let cache_hits = IntCounter::with_opts(Opts::new(
            "dashboard_cache_hits_total",
            "Response cache hits",
        ))
        .expect("Failed to create cache_hits counter");
        registry
            .register(Box::new(cache_hits.clone()))
            .expect("Failed to register cache_hits");

        let cache_misses = IntCounter::with_opts(Opts::new(
            "dashboard_cache_misses_total",
            "Response cache misses",
        ))
        .expect("Failed to create cache_misses counter");
        registry
            .register(Box::new(cache_misses.clone()))
            .expect("Failed to register cache_misses");

        let cache_write_failures = IntCounter::with_opts(Opts::new(
            "dashboard_cache_write_failures_total",
            "Response cache writes that failed",
        ))
        .expect("Failed to create cache_write_failures counter");
        registry
            .register(Box::new(cache_write_failures.clone()))
            .expect("Failed to register cache_write_failures");

        let sweeps = IntCounter::with_opts(Opts::new(
            "dashboard_cache_sweeps_total",
            "Completed cache sweep passes",
        ))
        .expect("Failed to create sweeps counter");
        registry
            .register(Box::new(sweeps.clone()))
            .expect("Failed to register sweeps");

        let swept_entries = IntCounter::with_opts(Opts::new(
            "dashboard_cache_swept_entries_total",
            "Cache entries removed by sweeps",
        ))
        .expect("Failed to create swept_entries counter");
        registry
            .register(Box::new(swept_entries.clone()))
            .expect("Failed to register swept_entries");

        let sweep_skips = IntCounterVec::new(
            Opts::new(
                "dashboard_cache_sweep_skips_total",
                "Sweep attempts that did not scan",
            ),
            &["reason"],
        )
        .expect("Failed to create sweep_skips counter");
        registry
            .register(Box::new(sweep_skips.clone()))
            .expect("Failed to register sweep_skips");

        let cache_entries = IntGauge::with_opts(Opts::new(
            "dashboard_cache_entries",
            "Cache entries on disk",
        ))
        .expect("Failed to create cache_entries gauge");
        registry
            .register(Box::new(cache_entries.clone()))
            .expect("Failed to register cache_entries");

        Self {
            registry,
            cache_hits,
            cache_misses,
            cache_write_failures,
            sweeps,
            swept_entries,
            sweep_skips,
            cache_entries,
        }
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record the outcome of a sweep attempt
    pub fn record_sweep(&self, outcome: &SweepOutcome) {
        match outcome {
            SweepOutcome::Completed(report) => {
                self.sweeps.inc();
                self.swept_entries.inc_by(report.removed() as u64);
            }
            other => self.sweep_skips.with_label_values(&[other.label()]).inc(),
        }
    }
}

impl Default for MetricsState {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics handler - returns Prometheus metrics in text format
///
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<MetricsState>>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = state.registry().gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, [("Content-Type", "text/plain")], Vec::new());
    }

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        buffer,
    )
}

/// Create metrics router
pub fn metrics_router() -> Router<Arc<MetricsState>> {
    Router::new().route("/metrics", get(metrics_handler))
}
