//! Concurrent message cache.
//!
//! The cache maps message text to its aggregation entry. All per-key
//! operations delegate to the Storage port, whose per-key locking makes
//! creation, increments and sweep removal linearizable for a given message.

use crate::application::ports::Storage;
use crate::domain::entry::{AggregationEntry, ExpiredEntry, MessageKey, Observation};
use crate::domain::record::Timestamp;
use std::cell::Cell;
use std::iter::FusedIterator;
use std::time::Duration;

/// Cache of aggregation state keyed by message text.
///
/// This type is generic over the storage implementation. In production,
/// use `Arc<ShardedStorage>`.
#[derive(Debug, Clone)]
pub struct MessageCache<S>
where
    S: Storage<MessageKey, AggregationEntry> + Clone,
{
    storage: S,
}

impl<S> MessageCache<S>
where
    S: Storage<MessageKey, AggregationEntry> + Clone,
{
    /// Create a cache over the given storage.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Return the entry for `key`, creating it if absent.
    ///
    /// The boolean is true only for the single caller that inserted the entry.
    pub fn lookup_or_create(&self, key: &str, now: Timestamp) -> (AggregationEntry, bool) {
        let created = Cell::new(false);
        let entry = self.storage.with_entry_mut(
            MessageKey::from(key),
            || {
                created.set(true);
                AggregationEntry::first_seen(now)
            },
            |entry| *entry,
        );
        (entry, created.get())
    }

    /// Count a repeat of an existing message.
    ///
    /// Returns the new count, or `None` if the message is not cached.
    pub fn increment(&self, key: &str, now: Timestamp) -> Option<u64> {
        self.storage.update(key, |entry| entry.record_repeat(now))
    }

    /// Record one observation of `key`.
    ///
    /// Creates the entry on first sight, otherwise increments it. Both paths
    /// run under the key's lock, so a concurrent sweep can never evict the
    /// entry between the lookup and the increment.
    pub fn record(&self, key: &str, now: Timestamp) -> Observation {
        self.record_with(key, now, |_| {})
    }

    /// Record one observation of `key`, calling `on_repeat` with the new
    /// count while the key is still locked.
    ///
    /// `on_repeat` is not called for the first occurrence. Side effects made
    /// inside it are ordered by count for a given key, even across threads.
    /// It must not touch this cache.
    pub fn record_with<F>(&self, key: &str, now: Timestamp, on_repeat: F) -> Observation
    where
        F: FnOnce(u64),
    {
        let mut on_repeat = Some(on_repeat);

        // Repeats are the hot path and need no key allocation
        let repeat = self.storage.update(key, |entry| {
            let count = entry.record_repeat(now);
            if let Some(f) = on_repeat.take() {
                f(count);
            }
            count
        });
        if let Some(count) = repeat {
            return Observation {
                count,
                was_new: false,
            };
        }

        let created = Cell::new(false);
        let count = self.storage.with_entry_mut(
            MessageKey::from(key),
            || {
                created.set(true);
                AggregationEntry::first_seen(now)
            },
            |entry| {
                if created.get() {
                    entry.count()
                } else {
                    // Another producer inserted it since our fast path missed
                    let count = entry.record_repeat(now);
                    if let Some(f) = on_repeat.take() {
                        f(count);
                    }
                    count
                }
            },
        );

        Observation {
            count,
            was_new: created.get(),
        }
    }

    /// Begin a sweep for entries idle longer than `timeout`.
    ///
    /// Candidate keys are snapshotted up front; each candidate is re-checked
    /// and removed under its lock only when the iterator reaches it. An entry
    /// refreshed in the meantime is skipped, and an entry that stays stale is
    /// yielded with its latest count.
    pub fn sweep(&self, now: Timestamp, timeout: Duration) -> Sweep<'_, S> {
        let candidates = self
            .storage
            .keys_where(|_, entry| entry.is_stale(now, timeout));

        Sweep {
            storage: &self.storage,
            candidates: candidates.into_iter(),
            now,
            timeout,
        }
    }

    /// Get a snapshot of the entry for `key`.
    pub fn get(&self, key: &str) -> Option<AggregationEntry> {
        self.storage.get_cloned(key)
    }

    /// Check whether `key` is cached.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Get the number of cached messages.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Drop all cached state without emitting summaries.
    pub fn clear(&self) {
        self.storage.clear();
    }
}

/// Lazy iterator over expired entries, removing each as it is yielded.
///
/// Created by [`MessageCache::sweep`]. It cannot be restarted; start a new
/// sweep instead.
#[derive(Debug)]
pub struct Sweep<'a, S> {
    storage: &'a S,
    candidates: std::vec::IntoIter<MessageKey>,
    now: Timestamp,
    timeout: Duration,
}

impl<S> Iterator for Sweep<'_, S>
where
    S: Storage<MessageKey, AggregationEntry>,
{
    type Item = ExpiredEntry;

    fn next(&mut self) -> Option<ExpiredEntry> {
        let (now, timeout) = (self.now, self.timeout);

        for key in self.candidates.by_ref() {
            let removed = self
                .storage
                .remove_if(&key, |_, entry| entry.is_stale(now, timeout));

            if let Some((message, entry)) = removed {
                return Some(ExpiredEntry {
                    message,
                    final_count: entry.count(),
                    last_seen: entry.last_seen(),
                });
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.candidates.len()))
    }
}

impl<S> FusedIterator for Sweep<'_, S> where S: Storage<MessageKey, AggregationEntry> {}
