//! Writing summary lines to the sink.
//!
//! Sink failures never propagate past this point: they are reported on the
//! operational log channel, counted, and discarded.
//!
//! When the reporter runs inside a `tracing` filter callback, emitting the
//! warning there would dispatch a nested event mid-filter. A deferred
//! reporter instead accumulates failures until [`SinkReporter::flush_failures`]
//! is called from outside the callback, which the sweeper does on every run.

use crate::application::metrics::Metrics;
use crate::application::ports::LogSink;
use crate::domain::record::Timestamp;
use crate::domain::summary::SummaryLine;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Shared writer for repeat lines and final tallies.
#[derive(Debug, Clone)]
pub struct SinkReporter {
    sink: Arc<dyn LogSink>,
    metrics: Metrics,
    deferred: bool,
    pending: Arc<PendingFailures>,
}

#[derive(Debug, Default)]
struct PendingFailures {
    count: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl SinkReporter {
    /// Create a reporter that warns about failures immediately.
    pub fn new(sink: Arc<dyn LogSink>, metrics: Metrics) -> Self {
        Self {
            sink,
            metrics,
            deferred: false,
            pending: Arc::new(PendingFailures::default()),
        }
    }

    /// Hold failure warnings until `flush_failures` is called.
    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }

    /// Write `line` prefixed with `[{at}] `.
    ///
    /// Returns whether the write succeeded.
    pub fn report(&self, at: Timestamp, line: &SummaryLine) -> bool {
        let rendered = format!("[{}] {}", at, line);

        match self.sink.write_line(&rendered) {
            Ok(()) => {
                self.metrics.record_summary_written();
                true
            }
            Err(e) => {
                self.metrics.record_sink_failure();
                self.pending.count.fetch_add(1, Ordering::Relaxed);
                *self
                    .pending
                    .last_error
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(e.to_string());

                if !self.deferred {
                    self.flush_failures();
                }
                false
            }
        }
    }

    /// Emit a warning for failures not yet reported.
    ///
    /// Returns the number of failures covered by the warning.
    pub fn flush_failures(&self) -> u64 {
        let failed = self.pending.count.swap(0, Ordering::Relaxed);
        if failed == 0 {
            return 0;
        }

        let last_error = self
            .pending
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_default();

        tracing::warn!(
            failed,
            error = %last_error,
            "failed to write summary lines"
        );
        failed
    }

    /// Close the sink, reporting but swallowing any failure.
    pub fn close(&self) {
        self.flush_failures();
        if let Err(e) = self.sink.close() {
            tracing::warn!(error = %e, "failed to close summary sink");
        }
    }

    /// The underlying sink.
    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }

    /// Metrics updated by this reporter.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::MemorySink;

    #[test]
    fn test_report_prefixes_timestamp() {
        let sink = Arc::new(MemorySink::new());
        let reporter = SinkReporter::new(sink.clone(), Metrics::new());
        let at = Timestamp::from_millis(1_700_000_000_000);

        assert!(reporter.report(at, &SummaryLine::repeat("Connection lost", 2)));

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], format!("[{}] [2x] Connection lost", at));
        assert_eq!(reporter.metrics().summaries_written(), 1);
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let sink = Arc::new(MemorySink::new());
        sink.set_failing(true);
        let reporter = SinkReporter::new(sink.clone(), Metrics::new());

        assert!(!reporter.report(Timestamp::from_millis(0), &SummaryLine::repeat("x", 2)));
        assert_eq!(reporter.metrics().sink_failures(), 1);
        assert_eq!(reporter.metrics().summaries_written(), 0);

        // Reported immediately, nothing left pending
        assert_eq!(reporter.flush_failures(), 0);

        // Later writes still go through once the sink recovers
        sink.set_failing(false);
        assert!(reporter.report(Timestamp::from_millis(0), &SummaryLine::repeat("x", 3)));
        assert_eq!(sink.messages(), vec!["[3x] x".to_string()]);
    }

    #[test]
    fn test_deferred_failures_accumulate() {
        let sink = Arc::new(MemorySink::new());
        sink.set_failing(true);
        let reporter = SinkReporter::new(sink.clone(), Metrics::new()).deferred();

        for count in 2..5 {
            reporter.report(Timestamp::from_millis(0), &SummaryLine::repeat("x", count));
        }

        assert_eq!(reporter.metrics().sink_failures(), 3);
        assert_eq!(reporter.flush_failures(), 3);
        assert_eq!(reporter.flush_failures(), 0);
    }

    #[test]
    fn test_close_is_forwarded() {
        let sink = Arc::new(MemorySink::new());
        let reporter = SinkReporter::new(sink.clone(), Metrics::new());

        reporter.close();
        reporter.close();

        assert_eq!(sink.close_count(), 1);
        assert!(!reporter.report(Timestamp::from_millis(0), &SummaryLine::repeat("x", 2)));
    }
}
