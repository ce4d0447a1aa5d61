//! # tracing-dedup
//!
//! Console log deduplication for the `tracing` ecosystem.
//!
//! This crate collapses repeated log messages. The first occurrence of a
//! message reaches your existing layers unchanged; every repeat is withheld
//! and recorded in a separate summary log as a running counter line. Once a
//! message has been quiet for a while, it is dropped from memory and, if it
//! was ever repeated, a final tally is written.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tracing_dedup::DedupLayer;
//! use tracing_subscriber::prelude::*;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let dedup = DedupLayer::builder()
//!     .with_log_directory("logs")
//!     .with_cleanup_interval(Duration::from_secs(60))
//!     .with_message_timeout(Duration::from_secs(300))
//!     .build()
//!     .unwrap();
//!
//! // Apply deduplication as a filter to your fmt layer
//! tracing_subscriber::registry()
//!     .with(tracing_subscriber::fmt::layer().with_filter(dedup.clone()))
//!     .init();
//!
//! // ...
//!
//! dedup.shutdown().await.expect("shutdown failed");
//! # }
//! ```
//!
//! To gate every layer of a subscriber at once, add the `DedupLayer` itself
//! as the innermost layer instead:
//!
//! ```rust,no_run
//! # use tracing_dedup::DedupLayer;
//! # use tracing_subscriber::prelude::*;
//! # let dedup = DedupLayer::builder()
//! #     .with_log_directory("logs")
//! #     .with_background_sweep(false)
//! #     .build()
//! #     .unwrap();
//! tracing_subscriber::registry()
//!     .with(dedup)
//!     .with(tracing_subscriber::fmt::layer())
//!     .init();
//! ```
//!
//! ## What Gets Written
//!
//! Messages are matched on their exact `message` text; structured fields,
//! level and target are not part of the key. Given three occurrences of
//! `Connection lost` in quick succession, the console shows it once and the
//! summary log receives:
//!
//! ```text
//! [2024-05-01 12:00:00] [2x] Connection lost
//! [2024-05-01 12:00:01] [3x] Connection lost
//! ```
//!
//! and, once the message has been idle for the message timeout:
//!
//! ```text
//! [2024-05-01 12:05:02] [ИТОГ] Сообщение 'Connection lost' повторялось 3 раз
//! ```
//!
//! A message seen only once leaves no trace in the summary log.
//!
//! ## Noise Filtering
//!
//! Some records are dropped outright: they are neither cached, forwarded,
//! nor summarized.
//!
//! - Blank messages
//! - Command echoes containing `" issued server command:"`
//! - Chat lines starting with `<`
//! - Lines containing `>` anywhere
//! - Messages registered at runtime through [`IgnoredMessages`]
//!
//! ```rust
//! use tracing_dedup::{FilterReason, IgnoredMessages, MessageFilter};
//!
//! let ignored = IgnoredMessages::new();
//! let filter = MessageFilter::new(ignored.clone());
//!
//! ignored.ignore("Autosave complete");
//! assert_eq!(filter.check("Autosave complete"), Some(FilterReason::Ignored));
//! assert_eq!(filter.check("<Player> hello"), Some(FilterReason::ChatPrefix));
//! assert_eq!(filter.check("Server started"), None);
//! ```
//!
//! ## Exempting Critical Events
//!
//! Events from targets passed to `.with_exempt_targets()` skip filtering and
//! deduplication and are always forwarded. This crate's own operational
//! events are always exempt.
//!
//! ## Without `tracing`
//!
//! [`Interceptor::publish`] accepts any [`Passthrough`], such as a closure or
//! a [`HandlerChain`] of existing handlers:
//!
//! ```rust,no_run
//! use tracing_dedup::{DedupLayer, HandlerChain, MessageRecord, Timestamp};
//!
//! let layer = DedupLayer::builder()
//!     .with_log_file("logs/summary.txt")
//!     .with_background_sweep(false)
//!     .build()
//!     .unwrap();
//!
//! let console = HandlerChain::new()
//!     .with_handler(|record: &MessageRecord| println!("{}", record.text));
//!
//! let record = MessageRecord::new("Server started", Timestamp::from_millis(0));
//! layer.publish(&record, &console);
//! ```
//!
//! ## Observability
//!
//! ```rust,no_run
//! # use tracing_dedup::DedupLayer;
//! # let dedup = DedupLayer::builder()
//! #     .with_log_directory("logs")
//! #     .with_background_sweep(false)
//! #     .build()
//! #     .unwrap();
//! let metrics = dedup.metrics();
//! println!("Forwarded: {}", metrics.records_forwarded());
//! println!("Aggregated: {}", metrics.records_aggregated());
//! println!("Sink failures: {}", metrics.sink_failures());
//!
//! let snapshot = metrics.snapshot();
//! println!("Aggregation rate: {:.2}%", snapshot.aggregation_rate() * 100.0);
//! ```
//!
//! Summary sink failures never reach the caller. They are counted and
//! reported as `WARN` events from this crate.

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    entry::{AggregationEntry, ExpiredEntry, MessageKey, Observation},
    filter::{FilterReason, IgnoredMessages, MessageFilter},
    record::{MessageRecord, Timestamp},
    summary::SummaryLine,
};

pub use application::{
    cache::{MessageCache, Sweep},
    interceptor::{Disposition, Interceptor},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, LogSink, Passthrough, SinkError, Storage},
    reporter::SinkReporter,
    sweeper::{
        SchedulerState, SweepConfig, SweepConfigError, SweepReport, SweepScheduler,
        DEFAULT_CLEANUP_INTERVAL, DEFAULT_MESSAGE_TIMEOUT,
    },
};

#[cfg(feature = "async")]
pub use application::sweeper::{ShutdownError, SweepHandle};

pub use infrastructure::{
    clock::SystemClock,
    layer::{BuildError, DedupLayer, DedupLayerBuilder, DefaultStorage},
    passthrough::HandlerChain,
    sink::FileSink,
    storage::ShardedStorage,
};
