//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `reconciler_passes_total` - Passes run, by result (`ok`/`error`)
//! - `reconciler_payments_checked_total` - Payments checked against fetched history
//! - `reconciler_payments_completed_total` - Payments completed
//! - `reconciler_payments_purged_total` - Expired payments deleted
//! - `reconciler_fetches_total` - Bank fetches, by outcome
//! - `reconciler_pass_duration_seconds` - Pass latency

use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    /// Registry holding every reconciler metric
    pub static ref REGISTRY: Registry = {
        let registry = Registry::new();
        register_all(&registry).expect("reconciler metrics register once");
        registry
    };

    /// Passes run, by result
    pub static ref PASSES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("reconciler_passes_total", "Reconciliation passes run"),
        &["result"]
    ).expect("metric can be created");

    /// Payments checked
    pub static ref PAYMENTS_CHECKED: IntCounter = IntCounter::new(
        "reconciler_payments_checked_total",
        "Payments checked against fetched transactions"
    ).expect("metric can be created");

    /// Payments completed
    pub static ref PAYMENTS_COMPLETED: IntCounter = IntCounter::new(
        "reconciler_payments_completed_total",
        "Payments completed"
    ).expect("metric can be created");

    /// Expired payments purged
    pub static ref PAYMENTS_PURGED: IntCounter = IntCounter::new(
        "reconciler_payments_purged_total",
        "Expired pending payments deleted"
    ).expect("metric can be created");

    /// Bank fetches, by outcome
    pub static ref FETCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("reconciler_fetches_total", "Bank transaction fetches"),
        &["outcome"]
    ).expect("metric can be created");

    /// Pass latency
    pub static ref PASS_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new("reconciler_pass_duration_seconds", "Reconciliation pass duration in seconds")
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0])
    ).expect("metric can be created");
}

fn register_all(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(PASSES_TOTAL.clone()))?;
    registry.register(Box::new(PAYMENTS_CHECKED.clone()))?;
    registry.register(Box::new(PAYMENTS_COMPLETED.clone()))?;
    registry.register(Box::new(PAYMENTS_PURGED.clone()))?;
    registry.register(Box::new(FETCHES_TOTAL.clone()))?;
    registry.register(Box::new(PASS_DURATION.clone()))?;
    Ok(())
}

/// Render all reconciler metrics in the Prometheus text format
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder.encode(&REGISTRY.gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
