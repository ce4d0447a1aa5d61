//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use crate::domain::record::{MessageRecord, Timestamp};
use std::borrow::Borrow;
use std::fmt::{self, Debug};
use std::hash::Hash;

/// Port for obtaining current wall-clock time.
///
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current time.
    fn now(&self) -> Timestamp;
}

/// Port for concurrent key-value storage.
///
/// Every method that touches a single key runs under that key's lock, so
/// read-modify-write sequences inside a closure are atomic with respect to
/// other callers on the same key.
/// Infrastructure provides concrete implementations (ShardedStorage).
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Access an entry with mutable access, creating it if necessary.
    ///
    /// # Arguments
    /// * `key` - The key to look up
    /// * `factory` - Function to create a new value if the key doesn't exist
    /// * `accessor` - Function that gets mutable access to the value
    ///
    /// # Returns
    /// The result from the accessor function
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R;

    /// Mutate an existing entry without allocating a key.
    ///
    /// Returns `None` if the key is absent.
    fn update<Q, F, R>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&mut V) -> R;

    /// Get a copy of a value.
    fn get_cloned<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone;

    /// Collect the keys of all entries matching the predicate.
    fn keys_where<P>(&self, predicate: P) -> Vec<K>
    where
        P: FnMut(&K, &V) -> bool;

    /// Remove an entry if the predicate holds at the moment of removal.
    fn remove_if<Q, P>(&self, key: &Q, predicate: P) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        P: FnOnce(&K, &V) -> bool;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;

    /// Clear all entries from the storage.
    fn clear(&self);
}

/// Error returned by a [`LogSink`].
#[derive(Debug)]
pub enum SinkError {
    /// The underlying writer failed
    Io(std::io::Error),
    /// The sink was already closed
    Closed,
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Io(e) => write!(f, "sink I/O error: {}", e),
            SinkError::Closed => write!(f, "sink is closed"),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::Io(e) => Some(e),
            SinkError::Closed => None,
        }
    }
}

impl From<std::io::Error> for SinkError {
    fn from(e: std::io::Error) -> Self {
        SinkError::Io(e)
    }
}

/// Port for the append-only summary destination.
///
/// Implementations must serialize concurrent writers and make each line
/// durable before returning.
pub trait LogSink: Send + Sync + Debug {
    /// Append one line. The sink adds the trailing newline.
    fn write_line(&self, line: &str) -> Result<(), SinkError>;

    /// Flush and release the underlying resource.
    ///
    /// Calling this more than once is a no-op.
    fn close(&self) -> Result<(), SinkError>;
}

/// Port for the downstream handlers that receive first occurrences.
///
/// Implemented for any `Fn(&MessageRecord)` closure.
pub trait Passthrough: Send + Sync {
    /// Hand the unmodified record to the original handlers.
    fn forward(&self, record: &MessageRecord);

    /// Flush buffered output. No-op by default.
    fn flush(&self) {}

    /// Release the handler. No-op by default.
    fn close(&self) {}
}

impl<F> Passthrough for F
where
    F: Fn(&MessageRecord) + Send + Sync,
{
    fn forward(&self, record: &MessageRecord) {
        self(record)
    }
}
