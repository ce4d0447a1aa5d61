//! Tracing integration layer.
//!
//! `DedupLayer` plugs the interceptor into a `tracing_subscriber` stack. Used
//! as a per-layer [`Filter`], it gates the wrapped layers: a first occurrence
//! is allowed through, repeats and noise are not. Used as a plain [`Layer`],
//! it gates every layer of the subscriber at once.

use crate::application::{
    cache::MessageCache,
    interceptor::{Disposition, Interceptor},
    metrics::Metrics,
    ports::{Clock, LogSink, Passthrough, SinkError, Storage},
    reporter::SinkReporter,
    sweeper::{SchedulerState, SweepConfig, SweepConfigError, SweepReport, SweepScheduler},
};
use crate::domain::entry::{AggregationEntry, MessageKey};
use crate::domain::filter::{IgnoredMessages, MessageFilter};
use crate::domain::record::MessageRecord;
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::sink::FileSink;
use crate::infrastructure::storage::ShardedStorage;
use crate::infrastructure::visitor::MessageVisitor;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Metadata, Subscriber};
use tracing_subscriber::layer::Filter;
use tracing_subscriber::{layer::Context, Layer};

#[cfg(feature = "async")]
use crate::application::sweeper::{ShutdownError, SweepHandle};
#[cfg(feature = "async")]
use std::sync::{Mutex, PoisonError};

/// Target prefix of this crate's own events.
const OWN_TARGET: &str = "tracing_dedup";

/// Storage used by layers created through the builder.
pub type DefaultStorage = Arc<ShardedStorage<MessageKey, AggregationEntry>>;

/// Error returned when building a `DedupLayer` fails.
#[derive(Debug)]
pub enum BuildError {
    /// No sink was configured
    MissingSink,
    /// The log file or its directory could not be created
    Sink(SinkError),
    /// Sweep configuration validation failed
    SweepConfig(SweepConfigError),
    /// Background sweeping was requested outside a tokio runtime
    #[cfg(feature = "async")]
    NoRuntime,
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::MissingSink => write!(f, "no summary sink configured"),
            BuildError::Sink(e) => write!(f, "failed to open summary sink: {}", e),
            BuildError::SweepConfig(e) => write!(f, "sweep configuration error: {}", e),
            #[cfg(feature = "async")]
            BuildError::NoRuntime => {
                write!(f, "background sweep requires a running tokio runtime")
            }
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Sink(e) => Some(e),
            BuildError::SweepConfig(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SinkError> for BuildError {
    fn from(e: SinkError) -> Self {
        BuildError::Sink(e)
    }
}

impl From<SweepConfigError> for BuildError {
    fn from(e: SweepConfigError) -> Self {
        BuildError::SweepConfig(e)
    }
}

/// Where summary lines go.
#[derive(Debug)]
enum SinkTarget {
    Custom(Arc<dyn LogSink>),
    File(PathBuf),
    Directory(PathBuf),
}

/// Builder for constructing a `DedupLayer`.
#[derive(Debug)]
pub struct DedupLayerBuilder {
    cleanup_interval: Duration,
    message_timeout: Duration,
    clock: Option<Arc<dyn Clock>>,
    sink: Option<SinkTarget>,
    ignored: IgnoredMessages,
    exempt_targets: BTreeSet<String>,
    background_sweep: bool,
}

impl DedupLayerBuilder {
    /// Set how often idle messages are swept.
    ///
    /// The interval will be validated when `build()` is called.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Set how long a message must be idle before it expires.
    ///
    /// The timeout will be validated when `build()` is called.
    pub fn with_message_timeout(mut self, timeout: Duration) -> Self {
        self.message_timeout = timeout;
        self
    }

    /// Set a custom clock (mainly for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Write summary lines to a custom sink.
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(SinkTarget::Custom(sink));
        self
    }

    /// Append summary lines to the file at `path`.
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sink = Some(SinkTarget::File(path.into()));
        self
    }

    /// Write summary lines to a new timestamped file inside `dir`.
    ///
    /// The file is named `console_log_YYYY-MM-DD_HH-MM-SS.txt` after the
    /// build time.
    pub fn with_log_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sink = Some(SinkTarget::Directory(dir.into()));
        self
    }

    /// Share a set of ignored messages with the layer.
    ///
    /// The set stays live: messages added through any clone after the layer
    /// is built are filtered from then on.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use tracing_dedup::{DedupLayer, IgnoredMessages};
    /// let ignored = IgnoredMessages::new();
    /// let layer = DedupLayer::builder()
    ///     .with_log_directory("logs")
    ///     .with_ignored_messages(ignored.clone())
    ///     .with_background_sweep(false)
    ///     .build()
    ///     .unwrap();
    ///
    /// ignored.ignore("Autosave complete");
    /// ```
    pub fn with_ignored_messages(mut self, ignored: IgnoredMessages) -> Self {
        self.ignored = ignored;
        self
    }

    /// Exempt specific targets from deduplication.
    ///
    /// Events from these targets skip the noise filter and the cache and are
    /// always allowed through. Targets are matched exactly. Duplicate targets
    /// are removed, and empty targets are filtered out.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use tracing_dedup::DedupLayer;
    /// let layer = DedupLayer::builder()
    ///     .with_log_directory("logs")
    ///     .with_exempt_targets(vec!["myapp::audit".to_string()])
    ///     .with_background_sweep(false)
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn with_exempt_targets(mut self, targets: Vec<String>) -> Self {
        let unique_targets: BTreeSet<_> = targets.into_iter().filter(|t| !t.is_empty()).collect();
        self.exempt_targets = unique_targets;
        self
    }

    /// Enable or disable the periodic sweep task.
    ///
    /// When enabled (the default with the `async` feature), `build()` must
    /// be called inside a tokio runtime. When disabled, sweeps only happen
    /// through [`DedupLayer::sweep_now`].
    pub fn with_background_sweep(mut self, enabled: bool) -> Self {
        self.background_sweep = enabled;
        self
    }

    /// Build the layer.
    ///
    /// # Errors
    /// Returns `BuildError` if the configuration is invalid, no sink was
    /// set, the log file cannot be created, or background sweeping was
    /// requested outside a tokio runtime.
    pub fn build(self) -> Result<DedupLayer, BuildError> {
        let config = SweepConfig::new(self.cleanup_interval, self.message_timeout)?;

        // Checked before touching the filesystem
        #[cfg(feature = "async")]
        if self.background_sweep && tokio::runtime::Handle::try_current().is_err() {
            return Err(BuildError::NoRuntime);
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));

        let sink: Arc<dyn LogSink> = match self.sink {
            None => return Err(BuildError::MissingSink),
            Some(SinkTarget::Custom(sink)) => sink,
            Some(SinkTarget::File(path)) => Arc::new(FileSink::open(path)?),
            Some(SinkTarget::Directory(dir)) => Arc::new(FileSink::create_in(dir, clock.now())?),
        };

        let mut layer = DedupLayer::assemble(
            Arc::new(ShardedStorage::new()),
            sink,
            clock,
            config,
            MessageFilter::new(self.ignored),
        );
        layer.exempt_targets = Arc::new(self.exempt_targets);

        #[cfg(feature = "async")]
        if self.background_sweep {
            let handle = layer.scheduler.clone().start();
            layer.sweep_handle = Arc::new(Mutex::new(Some(handle)));
        }

        Ok(layer)
    }
}

/// A `tracing` filter that collapses repeated messages.
///
/// The first occurrence of a message is allowed through unchanged. Repeats
/// are withheld and recorded as `[Nx] message` lines in the summary sink,
/// and a final tally is written once the message has been idle for the
/// configured timeout.
///
/// Clones share the same cache, sink and sweep task.
#[derive(Debug, Clone)]
pub struct DedupLayer<S = DefaultStorage>
where
    S: Storage<MessageKey, AggregationEntry> + Clone,
{
    interceptor: Interceptor<S>,
    scheduler: SweepScheduler<S>,
    exempt_targets: Arc<BTreeSet<String>>,
    #[cfg(feature = "async")]
    sweep_handle: Arc<Mutex<Option<SweepHandle>>>,
}

impl<S> DedupLayer<S>
where
    S: Storage<MessageKey, AggregationEntry> + Clone,
{
    fn assemble(
        storage: S,
        sink: Arc<dyn LogSink>,
        clock: Arc<dyn Clock>,
        config: SweepConfig,
        filter: MessageFilter,
    ) -> Self {
        let cache = MessageCache::new(storage);
        let reporter = SinkReporter::new(sink, Metrics::new()).deferred();

        Self {
            interceptor: Interceptor::new(
                cache.clone(),
                filter,
                reporter.clone(),
                Arc::clone(&clock),
            ),
            scheduler: SweepScheduler::new(cache, reporter, clock, config),
            exempt_targets: Arc::new(BTreeSet::new()),
            #[cfg(feature = "async")]
            sweep_handle: Arc::new(Mutex::new(None)),
        }
    }

    fn is_exempt(&self, target: &str) -> bool {
        let own = target == OWN_TARGET
            || target
                .strip_prefix(OWN_TARGET)
                .is_some_and(|rest| rest.starts_with("::"));

        // Skip the lookup if no exempt targets are configured (common case)
        own || (!self.exempt_targets.is_empty() && self.exempt_targets.contains(target))
    }

    fn check_event(&self, event: &tracing::Event<'_>) -> bool {
        if self.is_exempt(event.metadata().target()) {
            self.metrics().record_exempt();
            return true;
        }

        let mut visitor = MessageVisitor::new();
        event.record(&mut visitor);
        self.interceptor.intercept(&visitor.into_message()).is_forward()
    }

    /// Process a message outside of `tracing`.
    pub fn intercept(&self, text: &str) -> Disposition {
        self.interceptor.intercept(text)
    }

    /// Process a record and hand it to `passthrough` on first occurrence.
    pub fn publish<P>(&self, record: &MessageRecord, passthrough: &P) -> Disposition
    where
        P: Passthrough + ?Sized,
    {
        self.interceptor.publish(record, passthrough)
    }

    /// Run one sweep immediately, independent of the background task.
    pub fn sweep_now(&self) -> SweepReport {
        self.scheduler.run_once()
    }

    /// Get a reference to the underlying interceptor.
    pub fn interceptor(&self) -> &Interceptor<S> {
        &self.interceptor
    }

    /// Get a reference to the message cache.
    pub fn cache(&self) -> &MessageCache<S> {
        self.interceptor.cache()
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        self.interceptor.metrics()
    }

    /// Get the live set of ignored messages.
    pub fn ignored_messages(&self) -> &IgnoredMessages {
        self.interceptor.filter().ignored()
    }

    /// Get the sweep configuration.
    pub fn sweep_config(&self) -> &SweepConfig {
        self.scheduler.config()
    }

    /// Get the current number of cached messages.
    pub fn message_count(&self) -> usize {
        self.interceptor.cache().len()
    }

    /// State of the background sweep task.
    ///
    /// Layers built without a background sweep always report `Stopped`.
    pub fn sweep_state(&self) -> SchedulerState {
        #[cfg(feature = "async")]
        {
            let guard = self
                .sweep_handle
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(handle) = guard.as_ref() {
                return handle.state();
            }
        }
        SchedulerState::Stopped
    }

    /// Close the summary sink without stopping any sweep task.
    ///
    /// Later summary writes fail and are reported as sink failures.
    pub fn close_sink(&self) {
        self.interceptor.reporter().close();
    }

    /// Stop the sweep task, then close the summary sink.
    ///
    /// A sweep already in progress finishes before the sink is closed. The
    /// sink is closed even if the task failed; calling this again only
    /// re-closes the already closed sink, which is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the sweep task panicked or was aborted.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use tracing_dedup::DedupLayer;
    /// # async fn example() {
    /// let layer = DedupLayer::builder()
    ///     .with_log_directory("logs")
    ///     .build()
    ///     .unwrap();
    ///
    /// // Use the layer...
    ///
    /// layer.shutdown().await.expect("shutdown failed");
    /// # }
    /// ```
    #[cfg(feature = "async")]
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        // Take the handle while holding the lock, then release the lock before awaiting
        let handle = {
            let mut handle_guard = self
                .sweep_handle
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            handle_guard.take()
        };

        let result = match handle {
            Some(handle) => handle.shutdown().await,
            None => Ok(()),
        };

        self.close_sink();
        result
    }
}

impl DedupLayer<DefaultStorage> {
    /// Create a builder for configuring the layer.
    ///
    /// Defaults:
    /// - Cleanup interval: 60 seconds
    /// - Message timeout: 300 seconds
    /// - Background sweep: enabled with the `async` feature
    /// - Sink: none, one of `with_sink`, `with_log_file` or
    ///   `with_log_directory` is required
    pub fn builder() -> DedupLayerBuilder {
        let defaults = SweepConfig::default();
        DedupLayerBuilder {
            cleanup_interval: defaults.cleanup_interval,
            message_timeout: defaults.message_timeout,
            clock: None,
            sink: None,
            ignored: IgnoredMessages::new(),
            exempt_targets: BTreeSet::new(),
            background_sweep: cfg!(feature = "async"),
        }
    }

    /// Create a layer with a custom storage backend.
    ///
    /// No background sweep is started; drive expiry with
    /// [`DedupLayer::sweep_now`] or a [`SweepScheduler`] built from the
    /// layer's cache.
    ///
    /// # Arguments
    ///
    /// * `storage` - Custom storage implementation
    /// * `sink` - Destination for summary lines
    /// * `clock` - Clock implementation (use `SystemClock::new()` for production)
    /// * `config` - Sweep timing
    pub fn with_storage<ST>(
        storage: ST,
        sink: Arc<dyn LogSink>,
        clock: Arc<dyn Clock>,
        config: SweepConfig,
    ) -> DedupLayer<ST>
    where
        ST: Storage<MessageKey, AggregationEntry> + Clone,
    {
        DedupLayer::assemble(storage, sink, clock, config, MessageFilter::default())
    }
}

// Per-layer filter: the wrapped layer only sees allowed events
impl<S, Sub> Filter<Sub> for DedupLayer<S>
where
    S: Storage<MessageKey, AggregationEntry> + Clone,
    Sub: Subscriber,
{
    fn enabled(&self, _meta: &Metadata<'_>, _cx: &Context<'_, Sub>) -> bool {
        // Always return true - actual filtering happens in event_enabled
        true
    }

    fn event_enabled(&self, event: &tracing::Event<'_>, _cx: &Context<'_, Sub>) -> bool {
        self.check_event(event)
    }
}

// Global layer: a rejected event is dropped for the whole subscriber
impl<S, Sub> Layer<Sub> for DedupLayer<S>
where
    S: Storage<MessageKey, AggregationEntry> + Clone + 'static,
    Sub: Subscriber,
{
    fn event_enabled(&self, event: &tracing::Event<'_>, _ctx: Context<'_, Sub>) -> bool {
        self.check_event(event)
    }
}
