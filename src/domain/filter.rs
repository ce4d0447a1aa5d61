//! Structural noise filter applied before any aggregation.
//!
//! A message rejected here is dropped outright: it is neither cached,
//! counted, written to the sink, nor forwarded downstream.

use dashmap::DashSet;
use std::fmt;
use std::sync::Arc;

/// Substring marking a server command echo.
pub const COMMAND_ECHO_MARKER: &str = " issued server command:";

/// Why a message was rejected by the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterReason {
    /// Empty or whitespace-only text
    Blank,
    /// Server command echo
    CommandEcho,
    /// Starts with `<` (chat line prefix)
    ChatPrefix,
    /// Contains `>` anywhere
    ChatMarker,
    /// Listed in the ignored message set
    Ignored,
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            FilterReason::Blank => "blank message",
            FilterReason::CommandEcho => "command echo",
            FilterReason::ChatPrefix => "chat prefix",
            FilterReason::ChatMarker => "chat marker",
            FilterReason::Ignored => "ignored message",
        };
        f.write_str(reason)
    }
}

/// Set of message texts that are never cached or emitted.
///
/// Cloning shares the underlying set, so configuration code can keep a
/// clone and silence messages while the filter is live.
///
/// # Example
/// ```
/// use tracing_dedup::IgnoredMessages;
///
/// let ignored = IgnoredMessages::new();
/// let hook = ignored.clone();
///
/// hook.ignore("Saving chunks for level 'world'");
/// assert!(ignored.contains("Saving chunks for level 'world'"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct IgnoredMessages {
    messages: Arc<DashSet<String>>,
}

impl IgnoredMessages {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Silence a message. Returns false if it was already silenced.
    pub fn ignore(&self, message: impl Into<String>) -> bool {
        self.messages.insert(message.into())
    }

    /// Stop silencing a message. Returns true if it was silenced.
    pub fn unignore(&self, message: &str) -> bool {
        self.messages.remove(message).is_some()
    }

    /// Check whether a message is silenced.
    pub fn contains(&self, message: &str) -> bool {
        self.messages.contains(message)
    }

    /// Number of silenced messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if nothing is silenced.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for IgnoredMessages {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let ignored = IgnoredMessages::new();
        for message in iter {
            ignored.ignore(message);
        }
        ignored
    }
}

/// The filter rules, checked in order.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    ignored: IgnoredMessages,
}

impl MessageFilter {
    /// Create a filter backed by the given ignored set.
    pub fn new(ignored: IgnoredMessages) -> Self {
        Self { ignored }
    }

    /// Return the reason `message` must be dropped, or `None` to keep it.
    ///
    /// # Example
    /// ```
    /// use tracing_dedup::{FilterReason, MessageFilter};
    ///
    /// let filter = MessageFilter::default();
    /// assert_eq!(filter.check("Connection lost"), None);
    /// assert_eq!(filter.check("<Steve> hi"), Some(FilterReason::ChatPrefix));
    /// assert_eq!(filter.check("a -> b"), Some(FilterReason::ChatMarker));
    /// ```
    pub fn check(&self, message: &str) -> Option<FilterReason> {
        if message.trim().is_empty() {
            return Some(FilterReason::Blank);
        }
        if message.contains(COMMAND_ECHO_MARKER) {
            return Some(FilterReason::CommandEcho);
        }
        if message.starts_with('<') {
            return Some(FilterReason::ChatPrefix);
        }
        if message.contains('>') {
            return Some(FilterReason::ChatMarker);
        }
        if !self.ignored.is_empty() && self.ignored.contains(message) {
            return Some(FilterReason::Ignored);
        }
        None
    }

    /// The ignored set consulted by rule 5.
    pub fn ignored(&self) -> &IgnoredMessages {
        &self.ignored
    }
}
