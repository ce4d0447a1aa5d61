//! Field visitor for extracting the message text of an event.
//!
//! Only the `message` field participates in deduplication. Structured fields
//! are ignored, so `info!(attempt = 1, "Connection lost")` and
//! `info!(attempt = 2, "Connection lost")` are the same message.

use std::fmt;
use tracing::field::{Field, Visit};

const MESSAGE_FIELD: &str = "message";

/// A visitor that captures the formatted `message` field.
#[derive(Debug, Default)]
pub(crate) struct MessageVisitor {
    message: Option<String>,
}

impl MessageVisitor {
    /// Create a new message visitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the visitor and return the message, empty if none was recorded.
    pub fn into_message(self) -> String {
        self.message.unwrap_or_default()
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == MESSAGE_FIELD {
            self.message = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == MESSAGE_FIELD {
            // `fmt::Arguments` debug-formats as its rendered text
            self.message = Some(format!("{:?}", value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_visitor() {
        let visitor = MessageVisitor::new();
        assert_eq!(visitor.into_message(), "");
    }
}
