//! Fan-out to the handlers that existed before interception.

use crate::application::ports::Passthrough;
use crate::domain::record::MessageRecord;
use std::fmt;
use std::sync::Arc;

/// Ordered list of downstream handlers.
///
/// Forwarding a record calls every handler once, in registration order.
/// `flush` and `close` are passed through to every handler in the same order.
///
/// # Example
/// ```
/// use tracing_dedup::{HandlerChain, MessageRecord, Passthrough, Timestamp};
/// use std::sync::{Arc, Mutex};
///
/// let console = Arc::new(Mutex::new(Vec::new()));
/// let console_clone = Arc::clone(&console);
///
/// let chain = HandlerChain::new().with_handler(move |record: &MessageRecord| {
///     console_clone.lock().unwrap().push(record.text.clone());
/// });
///
/// chain.forward(&MessageRecord::new("Server started", Timestamp::from_millis(0)));
/// assert_eq!(console.lock().unwrap().len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct HandlerChain {
    handlers: Vec<Arc<dyn Passthrough>>,
}

impl HandlerChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler.
    pub fn with_handler(mut self, handler: impl Passthrough + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Append a shared handler.
    pub fn push(&mut self, handler: Arc<dyn Passthrough>) {
        self.handlers.push(handler);
    }

    /// Number of handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if the chain has no handlers.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Passthrough for HandlerChain {
    fn forward(&self, record: &MessageRecord) {
        for handler in &self.handlers {
            handler.forward(record);
        }
    }

    fn flush(&self) {
        for handler in &self.handlers {
            handler.flush();
        }
    }

    fn close(&self) {
        for handler in &self.handlers {
            handler.close();
        }
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
