//! Metrics definitions for the indexer.
//!
//! This module defines all metrics used throughout the indexer.
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "events_indexed_total",
        "Total number of events durably inserted into the event store"
    );
    describe_counter!(
        "decode_errors_total",
        "Total number of per-event decode failures (event skipped)"
    );
    describe_counter!(
        "fetch_errors_total",
        "Total number of failed event fetches from the RPC node"
    );
    describe_counter!(
        "persist_errors_total",
        "Total number of rolled-back batch persistence attempts"
    );
    describe_histogram!(
        "cycle_duration_seconds",
        "Time taken by one poll cycle in seconds"
    );
}

/// Record newly inserted events.
pub fn record_events_indexed(count: u64) {
    counter!("events_indexed_total").increment(count);
}

/// Record a per-event decode failure.
pub fn record_decode_error() {
    counter!("decode_errors_total").increment(1);
}

/// Record a failed fetch from the source.
pub fn record_fetch_error() {
    counter!("fetch_errors_total").increment(1);
}

/// Record a failed (rolled back) batch persistence.
pub fn record_persist_error() {
    counter!("persist_errors_total").increment(1);
}

/// Record poll cycle duration.
pub fn record_cycle_duration(duration_secs: f64) {
    histogram!("cycle_duration_seconds").record(duration_secs);
}

/// A timer that automatically records cycle duration when dropped.
pub struct CycleTimer {
    start: Instant,
}

impl CycleTimer {
    /// Start a new cycle timer.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for CycleTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CycleTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_cycle_duration(duration);
    }
}
