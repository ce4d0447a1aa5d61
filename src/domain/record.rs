//! Incoming log records and wall-clock timestamps.

use chrono::{DateTime, Local};
use std::fmt;
use std::time::Duration;

/// Format used for the prefix of every line written to a sink.
pub const LINE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format used in generated log file names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Wall-clock time in milliseconds since the Unix epoch.
///
/// Arithmetic between timestamps saturates, so a clock stepping backwards
/// never produces a negative age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a timestamp from milliseconds since the Unix epoch.
    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    /// Milliseconds since the Unix epoch.
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// Return a timestamp advanced by `duration`.
    pub fn saturating_add(&self, duration: Duration) -> Timestamp {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(millis))
    }

    /// Convert to a local date-time, if representable.
    pub fn to_local(&self) -> Option<DateTime<Local>> {
        let millis = i64::try_from(self.0).ok()?;
        DateTime::from_timestamp_millis(millis).map(|utc| utc.with_timezone(&Local))
    }

    /// Render with a `chrono` format string in local time.
    ///
    /// Falls back to the raw millisecond value when the timestamp is out of
    /// `chrono`'s range.
    pub fn format_local(&self, format: &str) -> String {
        match self.to_local() {
            Some(datetime) => datetime.format(format).to_string(),
            None => self.0.to_string(),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_local(LINE_TIMESTAMP_FORMAT))
    }
}

/// A single log record as delivered by the host logging system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    /// Message text, the deduplication key
    pub text: String,
    /// When the record was produced
    pub arrival: Timestamp,
}

impl MessageRecord {
    /// Create a record.
    pub fn new(text: impl Into<String>, arrival: Timestamp) -> Self {
        Self {
            text: text.into(),
            arrival,
        }
    }
}
