//! Summary lines written to the sink.
//!
//! Two shapes exist: the running repeat line written on every duplicate,
//! and the final tally written when a duplicated message expires.

use crate::domain::entry::ExpiredEntry;
use std::fmt;

/// A line destined for the sink, before the timestamp prefix is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryLine {
    /// `[{count}x] {message}`
    Repeat {
        /// The repeated message
        message: String,
        /// Count after this repetition
        count: u64,
    },
    /// `[ИТОГ] Сообщение '{message}' повторялось {count} раз`
    FinalTally {
        /// The expired message
        message: String,
        /// Total observations before expiry
        count: u64,
    },
}

impl SummaryLine {
    /// Repeat line for a duplicate observation.
    pub fn repeat(message: impl Into<String>, count: u64) -> Self {
        SummaryLine::Repeat {
            message: message.into(),
            count,
        }
    }

    /// Final tally for an expired entry, or `None` if it was never repeated.
    pub fn final_tally(expired: &ExpiredEntry) -> Option<Self> {
        if expired.final_count > 1 {
            Some(SummaryLine::FinalTally {
                message: expired.message.to_string(),
                count: expired.final_count,
            })
        } else {
            None
        }
    }

    /// The message this line reports on.
    pub fn message(&self) -> &str {
        match self {
            SummaryLine::Repeat { message, .. } | SummaryLine::FinalTally { message, .. } => {
                message
            }
        }
    }

    /// The count carried by this line.
    pub fn count(&self) -> u64 {
        match self {
            SummaryLine::Repeat { count, .. } | SummaryLine::FinalTally { count, .. } => *count,
        }
    }
}

impl fmt::Display for SummaryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryLine::Repeat { message, count } => write!(f, "[{}x] {}", count, message),
            SummaryLine::FinalTally { message, count } => write!(
                f,
                "[ИТОГ] Сообщение '{}' повторялось {} раз",
                message, count
            ),
        }
    }
}
