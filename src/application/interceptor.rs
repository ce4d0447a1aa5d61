//! Per-record gatekeeping and aggregation.
//!
//! The interceptor decides, for each incoming record, whether it is noise,
//! a first occurrence to pass through untouched, or a repeat to collapse
//! into a running counter line.

use crate::application::cache::MessageCache;
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, Passthrough, Storage};
use crate::application::reporter::SinkReporter;
use crate::domain::entry::{AggregationEntry, MessageKey};
use crate::domain::filter::{FilterReason, MessageFilter};
use crate::domain::record::{MessageRecord, Timestamp};
use crate::domain::summary::SummaryLine;
use std::sync::Arc;

/// What happened to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Dropped by the noise filter
    Filtered(FilterReason),
    /// First occurrence, must reach the original handlers
    Forward,
    /// Repeat occurrence, collapsed into a counter line
    Aggregated {
        /// Count after this occurrence
        count: u64,
    },
}

impl Disposition {
    /// Whether the record should be handed downstream.
    pub fn is_forward(&self) -> bool {
        matches!(self, Disposition::Forward)
    }
}

/// Coordinates filtering, caching and repeat reporting.
#[derive(Debug, Clone)]
pub struct Interceptor<S>
where
    S: Storage<MessageKey, AggregationEntry> + Clone,
{
    cache: MessageCache<S>,
    filter: MessageFilter,
    reporter: SinkReporter,
    clock: Arc<dyn Clock>,
}

impl<S> Interceptor<S>
where
    S: Storage<MessageKey, AggregationEntry> + Clone,
{
    /// Create a new interceptor.
    ///
    /// # Arguments
    /// * `cache` - Shared message cache, also visited by the sweeper
    /// * `filter` - Noise filter applied before caching
    /// * `reporter` - Destination for repeat lines
    /// * `clock` - Time source for records without an arrival time
    pub fn new(
        cache: MessageCache<S>,
        filter: MessageFilter,
        reporter: SinkReporter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache,
            filter,
            reporter,
            clock,
        }
    }

    /// Process a message observed now.
    pub fn intercept(&self, text: &str) -> Disposition {
        self.intercept_at(text, self.clock.now())
    }

    /// Process a message observed at `now`.
    ///
    /// # Performance
    /// This sits on the hot path of all log output:
    /// - Filter rules are plain substring checks
    /// - Repeats mutate the entry in place without allocating a key
    /// - The sink is only touched for repeats, while that message's lock is
    ///   held, so repeat lines for one message are written in count order
    pub fn intercept_at(&self, text: &str, now: Timestamp) -> Disposition {
        let metrics = self.reporter.metrics();

        if let Some(reason) = self.filter.check(text) {
            metrics.record_filtered();
            return Disposition::Filtered(reason);
        }

        // The repeat line is written under the key's lock so that lines for
        // one message reach the sink in count order
        let observation = self.cache.record_with(text, now, |count| {
            self.reporter.report(now, &SummaryLine::repeat(text, count));
        });

        if observation.was_new {
            metrics.record_forwarded();
            return Disposition::Forward;
        }

        metrics.record_aggregated();

        Disposition::Aggregated {
            count: observation.count,
        }
    }

    /// Process a record and forward it downstream on first occurrence.
    ///
    /// The passthrough is invoked at most once, with the unmodified record.
    pub fn publish<P>(&self, record: &MessageRecord, passthrough: &P) -> Disposition
    where
        P: Passthrough + ?Sized,
    {
        let disposition = self.intercept_at(&record.text, record.arrival);
        if disposition.is_forward() {
            passthrough.forward(record);
        }
        disposition
    }

    /// Get a reference to the cache.
    pub fn cache(&self) -> &MessageCache<S> {
        &self.cache
    }

    /// Get a reference to the filter.
    pub fn filter(&self) -> &MessageFilter {
        &self.filter
    }

    /// Get a reference to the reporter.
    pub fn reporter(&self) -> &SinkReporter {
        &self.reporter
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        self.reporter.metrics()
    }

    /// Get the clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
