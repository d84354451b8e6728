//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Caption pipeline runs and per-step latency
//! - Flavor catalog writes

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Caption Pipeline Metrics
// =============================================================================

/// Pipeline runs by result.
pub static PIPELINE_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("humorflow_pipeline_runs_total", "Total caption pipeline runs"),
        &["result"], // "success", "step_failed", "fault", "rejected"
    )
    .unwrap()
});

/// Duration of each remote pipeline step.
pub static PIPELINE_STEP_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "humorflow_pipeline_step_duration_seconds",
            "Duration of caption pipeline steps",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["step", "status"],
    )
    .unwrap()
});

/// Captions returned by successful runs.
pub static CAPTIONS_GENERATED: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "humorflow_captions_generated",
            "Number of captions returned per successful run",
        )
        .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0]),
    )
    .unwrap()
});

// =============================================================================
// Flavor Catalog Metrics
// =============================================================================

/// Catalog writes by entity and operation.
pub static CATALOG_WRITES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("humorflow_catalog_writes_total", "Flavor catalog writes"),
        &["entity", "operation"], // entity: "flavor" | "step" | "lookup"
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Pipeline
        Box::new(PIPELINE_RUNS.clone()),
        Box::new(PIPELINE_STEP_DURATION.clone()),
        Box::new(CAPTIONS_GENERATED.clone()),
        // Catalog
        Box::new(CATALOG_WRITES.clone()),
    ]
}
