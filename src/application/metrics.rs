//! Observability metrics for message aggregation.
//!
//! Provides counters describing what the interceptor and sweeper did with
//! each record, for monitoring and debugging.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking aggregation statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// First occurrences handed to the passthrough
    records_forwarded: AtomicU64,
    /// Repeats collapsed into a counter line
    records_aggregated: AtomicU64,
    /// Records dropped by the noise filter
    records_filtered: AtomicU64,
    /// Records from exempt targets, forwarded without aggregation
    records_exempt: AtomicU64,
    /// Entries removed by the sweep
    entries_expired: AtomicU64,
    /// Lines successfully written to the sink
    summaries_written: AtomicU64,
    /// Sink writes that failed
    sink_failures: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    pub(crate) fn record_forwarded(&self) {
        self.inner.records_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_aggregated(&self) {
        self.inner.records_aggregated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_filtered(&self) {
        self.inner.records_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_exempt(&self) {
        self.inner.records_exempt.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expired(&self) {
        self.inner.entries_expired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_summary_written(&self) {
        self.inner.summaries_written.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sink_failure(&self) {
        self.inner.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// First occurrences forwarded downstream.
    pub fn records_forwarded(&self) -> u64 {
        self.inner.records_forwarded.load(Ordering::Relaxed)
    }

    /// Repeats collapsed into counter lines.
    pub fn records_aggregated(&self) -> u64 {
        self.inner.records_aggregated.load(Ordering::Relaxed)
    }

    /// Records dropped by the filter.
    pub fn records_filtered(&self) -> u64 {
        self.inner.records_filtered.load(Ordering::Relaxed)
    }

    /// Records that bypassed aggregation.
    pub fn records_exempt(&self) -> u64 {
        self.inner.records_exempt.load(Ordering::Relaxed)
    }

    /// Entries removed by sweeps.
    pub fn entries_expired(&self) -> u64 {
        self.inner.entries_expired.load(Ordering::Relaxed)
    }

    /// Lines written to the sink.
    pub fn summaries_written(&self) -> u64 {
        self.inner.summaries_written.load(Ordering::Relaxed)
    }

    /// Failed sink writes.
    pub fn sink_failures(&self) -> u64 {
        self.inner.sink_failures.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_forwarded: self.records_forwarded(),
            records_aggregated: self.records_aggregated(),
            records_filtered: self.records_filtered(),
            records_exempt: self.records_exempt(),
            entries_expired: self.entries_expired(),
            summaries_written: self.summaries_written(),
            sink_failures: self.sink_failures(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.records_forwarded.store(0, Ordering::Relaxed);
        self.inner.records_aggregated.store(0, Ordering::Relaxed);
        self.inner.records_filtered.store(0, Ordering::Relaxed);
        self.inner.records_exempt.store(0, Ordering::Relaxed);
        self.inner.entries_expired.store(0, Ordering::Relaxed);
        self.inner.summaries_written.store(0, Ordering::Relaxed);
        self.inner.sink_failures.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// First occurrences forwarded downstream
    pub records_forwarded: u64,
    /// Repeats collapsed into counter lines
    pub records_aggregated: u64,
    /// Records dropped by the filter
    pub records_filtered: u64,
    /// Records that bypassed aggregation
    pub records_exempt: u64,
    /// Entries removed by sweeps
    pub entries_expired: u64,
    /// Lines written to the sink
    pub summaries_written: u64,
    /// Failed sink writes
    pub sink_failures: u64,
}

impl MetricsSnapshot {
    /// Total records seen by the interceptor, including filtered ones.
    pub fn total_records(&self) -> u64 {
        self.records_forwarded
            .saturating_add(self.records_aggregated)
            .saturating_add(self.records_filtered)
            .saturating_add(self.records_exempt)
    }

    /// Fraction of deduplicated records that were collapsed (0.0 to 1.0).
    ///
    /// Returns 0.0 if nothing reached the cache.
    pub fn aggregation_rate(&self) -> f64 {
        let cached = self
            .records_forwarded
            .saturating_add(self.records_aggregated);
        if cached == 0 {
            0.0
        } else {
            self.records_aggregated as f64 / cached as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initial_state() {
        let snapshot = Metrics::new().snapshot();
        assert_eq!(snapshot.total_records(), 0);
        assert_eq!(snapshot.entries_expired, 0);
        assert_eq!(snapshot.summaries_written, 0);
        assert_eq!(snapshot.sink_failures, 0);
    }

    #[test]
    fn test_snapshot() {
        let metrics = Metrics::new();
        metrics.record_forwarded();
        metrics.record_aggregated();
        metrics.record_aggregated();
        metrics.record_filtered();
        metrics.record_exempt();
        metrics.record_expired();
        metrics.record_summary_written();
        metrics.record_sink_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.records_forwarded, 1);
        assert_eq!(snapshot.records_aggregated, 2);
        assert_eq!(snapshot.records_filtered, 1);
        assert_eq!(snapshot.records_exempt, 1);
        assert_eq!(snapshot.entries_expired, 1);
        assert_eq!(snapshot.summaries_written, 1);
        assert_eq!(snapshot.sink_failures, 1);
        assert_eq!(snapshot.total_records(), 5);
    }

    #[test]
    fn test_aggregation_rate() {
        let metrics = Metrics::new();
        assert_eq!(metrics.snapshot().aggregation_rate(), 0.0);

        // Filtered records do not count toward the rate
        metrics.record_filtered();
        assert_eq!(metrics.snapshot().aggregation_rate(), 0.0);

        metrics.record_forwarded();
        metrics.record_aggregated();
        metrics.record_aggregated();
        metrics.record_aggregated();
        assert!((metrics.snapshot().aggregation_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reset() {
        let metrics = Metrics::new();
        metrics.record_forwarded();
        metrics.record_sink_failure();

        metrics.reset();
        assert_eq!(metrics.snapshot().total_records(), 0);
        assert_eq!(metrics.sink_failures(), 0);
    }

    #[test]
    fn test_metrics_clone_shares_counters() {
        let metrics1 = Metrics::new();
        metrics1.record_forwarded();

        let metrics2 = metrics1.clone();
        metrics2.record_forwarded();

        assert_eq!(metrics1.records_forwarded(), 2);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::thread;

        let metrics = Metrics::new();
        let mut handles = vec![];

        for _ in 0..10 {
            let m = metrics.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    m.record_aggregated();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.records_aggregated(), 1000);
    }
}
