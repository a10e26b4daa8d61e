//! Prometheus metrics for the command line.
//!
//! The registry carries every core metric plus the number of jobs the
//! current `convert` run is still waiting for. It is printed in the text
//! exposition format when `--metrics` is given.

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntGauge, Registry, TextEncoder};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Jobs enqueued by this run that have not finished yet.
pub static JOBS_PENDING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "aax2m4b_cli_jobs_pending",
        "Number of jobs the command line is waiting for",
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    registry.register(Box::new(JOBS_PENDING.clone())).unwrap();

    // Core metrics (supervisor, pipeline, key recovery)
    for metric in aax2m4b_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
