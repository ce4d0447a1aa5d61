//! Periodic expiry of idle messages.
//!
//! Each run drains the cache's stale entries and writes a final tally for
//! every message that was repeated while it was cached.

use crate::application::cache::MessageCache;
use crate::application::ports::{Clock, Storage};
use crate::application::reporter::SinkReporter;
use crate::domain::entry::{AggregationEntry, MessageKey};
use crate::domain::summary::SummaryLine;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "async")]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "async")]
use tokio::sync::oneshot;
#[cfg(feature = "async")]
use tokio::task::JoinHandle;

/// Default period between sweeps.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Default idle time after which a message expires.
pub const DEFAULT_MESSAGE_TIMEOUT: Duration = Duration::from_secs(300);

/// Error returned when sweep configuration validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepConfigError {
    /// Cleanup interval must be greater than zero
    ZeroCleanupInterval,
    /// Message timeout must be greater than zero
    ZeroMessageTimeout,
}

impl std::fmt::Display for SweepConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SweepConfigError::ZeroCleanupInterval => {
                write!(f, "cleanup interval must be greater than 0")
            }
            SweepConfigError::ZeroMessageTimeout => {
                write!(f, "message timeout must be greater than 0")
            }
        }
    }
}

impl std::error::Error for SweepConfigError {}

/// Configuration for the sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    /// How often to sweep
    pub cleanup_interval: Duration,
    /// Idle time after which an entry expires
    pub message_timeout: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            message_timeout: DEFAULT_MESSAGE_TIMEOUT,
        }
    }
}

impl SweepConfig {
    /// Create a validated sweep config.
    ///
    /// # Errors
    /// Returns an error if either duration is zero.
    pub fn new(
        cleanup_interval: Duration,
        message_timeout: Duration,
    ) -> Result<Self, SweepConfigError> {
        if cleanup_interval.is_zero() {
            return Err(SweepConfigError::ZeroCleanupInterval);
        }
        if message_timeout.is_zero() {
            return Err(SweepConfigError::ZeroMessageTimeout);
        }
        Ok(Self {
            cleanup_interval,
            message_timeout,
        })
    }
}

/// Outcome of one sweep run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries removed from the cache
    pub expired: usize,
    /// Final tallies written to the sink
    pub summarized: usize,
}

/// Lifecycle of a running scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Sweeping on every tick
    Running,
    /// No further sweeps will run
    Stopped,
}

/// Sweeps expired entries out of the cache and reports their final counts.
#[derive(Debug, Clone)]
pub struct SweepScheduler<S>
where
    S: Storage<MessageKey, AggregationEntry> + Clone,
{
    cache: MessageCache<S>,
    reporter: SinkReporter,
    clock: Arc<dyn Clock>,
    config: SweepConfig,
}

impl<S> SweepScheduler<S>
where
    S: Storage<MessageKey, AggregationEntry> + Clone,
{
    /// Create a new sweeper.
    pub fn new(
        cache: MessageCache<S>,
        reporter: SinkReporter,
        clock: Arc<dyn Clock>,
        config: SweepConfig,
    ) -> Self {
        Self {
            cache,
            reporter,
            clock,
            config,
        }
    }

    /// Run a single sweep now.
    ///
    /// Entries seen once expire silently; repeated entries produce a final
    /// tally line. Sink failures are reported and do not stop the sweep.
    pub fn run_once(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        for expired in self.cache.sweep(now, self.config.message_timeout) {
            report.expired += 1;
            self.reporter.metrics().record_expired();

            if let Some(line) = SummaryLine::final_tally(&expired) {
                if self.reporter.report(now, &line) {
                    report.summarized += 1;
                }
            }
        }

        // Also surfaces failures deferred by the interception path
        self.reporter.flush_failures();

        if report.expired > 0 {
            tracing::debug!(
                expired = report.expired,
                summarized = report.summarized,
                remaining = self.cache.len(),
                "swept idle messages"
            );
        }

        report
    }

    /// Start sweeping periodically on the current tokio runtime.
    ///
    /// The first sweep runs one full interval after start. The returned
    /// handle stops the task when shut down or dropped; a sweep already in
    /// progress always runs to completion.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    #[cfg(feature = "async")]
    pub fn start(self) -> SweepHandle
    where
        S: 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let running = Arc::new(AtomicBool::new(true));
        let running_flag = Arc::clone(&running);

        let join = tokio::spawn(async move {
            let period = self.config.cleanup_interval;
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    // Fires on explicit shutdown and when the handle is dropped
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        self.run_once();
                    }
                }
            }

            running_flag.store(false, Ordering::Release);
            tracing::debug!("sweep scheduler stopped");
        });

        SweepHandle {
            shutdown_tx: Some(shutdown_tx),
            join,
            running,
        }
    }

    /// Get the sweep configuration.
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Get a reference to the cache.
    pub fn cache(&self) -> &MessageCache<S> {
        &self.cache
    }

    /// Get a reference to the reporter.
    pub fn reporter(&self) -> &SinkReporter {
        &self.reporter
    }
}

/// Error returned when the sweep task does not stop cleanly.
#[cfg(feature = "async")]
#[derive(Debug)]
pub struct ShutdownError(tokio::task::JoinError);

#[cfg(feature = "async")]
impl std::fmt::Display for ShutdownError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sweep task failed during shutdown: {}", self.0)
    }
}

#[cfg(feature = "async")]
impl std::error::Error for ShutdownError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Handle to a running sweep task.
#[cfg(feature = "async")]
#[derive(Debug)]
pub struct SweepHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
    running: Arc<AtomicBool>,
}

#[cfg(feature = "async")]
impl SweepHandle {
    /// Current scheduler state.
    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::Acquire) {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    /// Stop the scheduler and wait for the task to exit.
    ///
    /// # Errors
    /// Returns an error if the task panicked or was aborted.
    pub async fn shutdown(mut self) -> Result<(), ShutdownError> {
        if let Some(tx) = self.shutdown_tx.take() {
            // The task may already have exited; nothing to signal then
            let _ = tx.send(());
        }
        (&mut self.join).await.map_err(ShutdownError)
    }
}
