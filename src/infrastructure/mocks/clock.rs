//! Mock clock for testing.

use crate::application::ports::Clock;
use crate::domain::record::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Mock clock for testing.
///
/// Allows tests to control time progression explicitly, enabling deterministic
/// testing of message expiry.
///
/// # Examples
///
/// ```
/// use tracing_dedup::infrastructure::mocks::MockClock;
/// use tracing_dedup::{Clock, Timestamp};
/// use std::time::Duration;
///
/// let clock = MockClock::new(Timestamp::from_millis(0));
///
/// clock.advance(Duration::from_secs(10));
/// assert_eq!(clock.now(), Timestamp::from_millis(10_000));
///
/// clock.set(Timestamp::from_millis(300_001));
/// assert_eq!(clock.now().as_millis(), 300_001);
/// ```
///
/// # Thread Safety
///
/// All clones share the same underlying time value, so advancing time in
/// one clone affects all clones.
#[derive(Debug, Clone)]
pub struct MockClock {
    current_millis: Arc<AtomicU64>,
}

impl MockClock {
    /// Create a mock clock starting at a specific time.
    pub fn new(start: Timestamp) -> Self {
        Self {
            current_millis: Arc::new(AtomicU64::new(start.as_millis())),
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.advance_millis(millis);
    }

    /// Advance the clock by a number of milliseconds.
    pub fn advance_millis(&self, millis: u64) {
        self.current_millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Set the clock to a specific time.
    pub fn set(&self, timestamp: Timestamp) {
        self.current_millis
            .store(timestamp.as_millis(), Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.current_millis.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_clock() {
        let clock = MockClock::new(Timestamp::from_millis(1_000));
        assert_eq!(clock.now(), Timestamp::from_millis(1_000));

        clock.advance(Duration::from_secs(10));
        assert_eq!(clock.now(), Timestamp::from_millis(11_000));

        clock.set(Timestamp::from_millis(5));
        assert_eq!(clock.now(), Timestamp::from_millis(5));
    }

    #[test]
    fn test_clones_share_time() {
        let clock = MockClock::new(Timestamp::from_millis(0));
        let clone = clock.clone();

        std::thread::spawn(move || clone.advance_millis(500))
            .join()
            .unwrap();

        assert_eq!(clock.now().as_millis(), 500);
    }
}
