//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Supervisor (jobs enqueued and finished)
//! - Pipeline (stage durations and failures)
//! - Key recovery (lookup tables tried)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Supervisor Metrics
// =============================================================================

/// Jobs enqueued total.
pub static JOBS_ENQUEUED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("aax2m4b_jobs_enqueued_total", "Total conversion jobs enqueued").unwrap()
});

/// Jobs finished total by outcome.
pub static JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("aax2m4b_jobs_finished_total", "Total conversion jobs finished"),
        &["outcome"], // "done", "cancelled", "failed"
    )
    .unwrap()
});

// =============================================================================
// Pipeline Metrics
// =============================================================================

/// Stage duration in seconds.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "aax2m4b_stage_duration_seconds",
            "Duration of pipeline stages",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 3600.0]),
        &["stage"],
    )
    .unwrap()
});

/// Stage failures total by reason.
pub static STAGE_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("aax2m4b_stage_failures_total", "Total pipeline stage failures"),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Key Recovery Metrics
// =============================================================================

/// Lookup tables tried total.
pub static LOOKUP_TABLES_TRIED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "aax2m4b_lookup_tables_tried_total",
        "Total rainbow-table lookups started",
    )
    .unwrap()
});

/// Returns all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Supervisor
        Box::new(JOBS_ENQUEUED.clone()),
        Box::new(JOBS_FINISHED.clone()),
        // Pipeline
        Box::new(STAGE_DURATION.clone()),
        Box::new(STAGE_FAILURES.clone()),
        // Key recovery
        Box::new(LOOKUP_TABLES_TRIED.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn test_all_metrics_register() {
        let registry = Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }

        JOBS_FINISHED.with_label_values(&["done"]).inc();
        STAGE_DURATION.with_label_values(&["transcode"]).observe(1.5);

        let names: Vec<_> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"aax2m4b_jobs_finished_total".to_string()));
        assert!(names.contains(&"aax2m4b_stage_duration_seconds".to_string()));
    }
}
