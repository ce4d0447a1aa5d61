//! Per-message aggregation state.

use crate::domain::record::Timestamp;
use std::sync::Arc;
use std::time::Duration;

/// Cache key: the full message text.
///
/// Shared ownership keeps key snapshots cheap during a sweep.
pub type MessageKey = Arc<str>;

/// Aggregation state for one distinct message.
///
/// `count` starts at 1 on creation and only grows until the entry is evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationEntry {
    count: u64,
    last_seen: Timestamp,
}

impl AggregationEntry {
    /// Create the entry for a first observation.
    pub fn first_seen(now: Timestamp) -> Self {
        Self {
            count: 1,
            last_seen: now,
        }
    }

    /// Record a repeat observation and return the new count.
    pub fn record_repeat(&mut self, now: Timestamp) -> u64 {
        self.count = self.count.saturating_add(1);
        // Concurrent producers may deliver slightly out-of-order timestamps
        self.last_seen = self.last_seen.max(now);
        self.count
    }

    /// Number of observations since creation.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Time of the most recent observation.
    pub fn last_seen(&self) -> Timestamp {
        self.last_seen
    }

    /// Whether more than `timeout` has passed since the last observation.
    pub fn is_stale(&self, now: Timestamp, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > timeout
    }

    /// Whether the message was ever repeated.
    pub fn is_duplicate(&self) -> bool {
        self.count > 1
    }
}

/// Outcome of recording one observation in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Count after this observation
    pub count: u64,
    /// True if this observation created the entry
    pub was_new: bool,
}

/// An entry removed from the cache by a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredEntry {
    /// The message text
    pub message: MessageKey,
    /// Count at the moment of removal
    pub final_count: u64,
    /// Last observation before removal
    pub last_seen: Timestamp,
}
