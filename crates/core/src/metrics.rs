//! Prometheus metrics for the reconciliation cycle.
//!
//! - Cycle outcomes and duration
//! - Enqueue attempts against the torrent client
//! - Ledger evictions and upstream request failures

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Cycle Metrics
// =============================================================================

/// Cycles finished by result.
pub static CYCLES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("anisync_cycles_total", "Total reconciliation cycles"),
        &["result"], // "completed", "cancelled", "failed"
    )
    .unwrap()
});

/// Cycle duration in seconds.
pub static CYCLE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "anisync_cycle_duration_seconds",
            "Duration of reconciliation cycles",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Download Metrics
// =============================================================================

/// Torrents handed to the client.
pub static TORRENTS_ENQUEUED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "anisync_torrents_enqueued_total",
        "Total torrents added to the client",
    )
    .unwrap()
});

/// Episodes for which no candidate could be enqueued.
pub static ENQUEUE_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "anisync_enqueue_failures_total",
        "Total episodes that could not be enqueued in a cycle",
    )
    .unwrap()
});

/// Ledger rows removed (watched, saturated or orphaned).
pub static EPISODES_EVICTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "anisync_episodes_evicted_total",
        "Total ledger rows evicted together with their torrents",
    )
    .unwrap()
});

/// Torrents moved to the completed folder.
pub static TORRENTS_RELOCATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "anisync_torrents_relocated_total",
        "Total torrents moved to the completed folder",
    )
    .unwrap()
});

// =============================================================================
// External Services
// =============================================================================

/// Upstream request failures by service.
pub static UPSTREAM_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("anisync_upstream_errors_total", "Total failed upstream requests"),
        &["service"], // "tracker", "indexer", "torrent_client"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CYCLES_TOTAL.clone()),
        Box::new(CYCLE_DURATION.clone()),
        Box::new(TORRENTS_ENQUEUED.clone()),
        Box::new(ENQUEUE_FAILURES.clone()),
        Box::new(EPISODES_EVICTED.clone()),
        Box::new(TORRENTS_RELOCATED.clone()),
        Box::new(UPSTREAM_ERRORS.clone()),
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
        CYCLES_TOTAL.with_label_values(&["completed"]).inc();
        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|f| f.get_name().to_string())
            .collect();
        assert!(names.contains(&"anisync_cycles_total".to_string()));
    }
}
