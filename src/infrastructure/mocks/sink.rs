//! In-memory sink for testing.

use crate::application::ports::{LogSink, SinkError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Sink that keeps every written line in memory.
///
/// Can be switched into a failing mode to exercise error reporting, and
/// counts how many times it was actually closed.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
    failing: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    closes: Arc<AtomicUsize>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All lines written so far, including their timestamp prefix.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .expect("MemorySink mutex poisoned - a test thread panicked while holding the lock")
            .clone()
    }

    /// Lines with the leading `[timestamp] ` prefix removed.
    pub fn messages(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .map(|line| match line.split_once("] ") {
                Some((prefix, rest)) if prefix.starts_with('[') => rest.to_string(),
                _ => line,
            })
            .collect()
    }

    /// Number of times the sink transitioned from open to closed.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Whether the sink has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Drop all captured lines.
    pub fn clear(&self) {
        self.lines
            .lock()
            .expect("MemorySink mutex poisoned - a test thread panicked while holding the lock")
            .clear();
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, line: &str) -> Result<(), SinkError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SinkError::Closed);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "simulated write failure",
            )));
        }

        self.lines
            .lock()
            .expect("MemorySink mutex poisoned - a test thread panicked while holding the lock")
            .push(line.to_string());
        Ok(())
    }

    fn close(&self) -> Result<(), SinkError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
