//! Integration tests for exempt targets functionality.

use std::sync::Arc;
use tracing::info;
use tracing_dedup::infrastructure::mocks::{MemorySink, MockCaptureLayer};
use tracing_dedup::DedupLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

#[test]
fn test_exempt_targets_never_deduplicated() {
    let sink = Arc::new(MemorySink::new());
    let layer = DedupLayer::builder()
        .with_sink(sink.clone())
        .with_exempt_targets(vec![
            "security::audit".to_string(),
            "compliance::logging".to_string(),
        ])
        .with_background_sweep(false)
        .build()
        .unwrap();
    let capture = MockCaptureLayer::new();

    let subscriber =
        tracing_subscriber::registry().with(capture.clone().with_filter(layer.clone()));

    tracing::subscriber::with_default(subscriber, || {
        // Regular events - collapsed after the first
        for _ in 0..5 {
            info!("Normal event");
        }

        for _ in 0..10 {
            info!(target: "security::audit", "Security event");
        }

        for _ in 0..10 {
            info!(target: "compliance::logging", "Compliance event");
        }
    });

    // 1 normal event + 10 security + 10 compliance
    assert_eq!(capture.count(), 21);

    let metrics = layer.metrics();
    assert_eq!(metrics.records_forwarded(), 1);
    assert_eq!(metrics.records_aggregated(), 4);
    assert_eq!(metrics.records_exempt(), 20);
    assert_eq!(sink.lines().len(), 4);
}

#[test]
fn test_exempt_targets_skip_noise_filter() {
    let sink = Arc::new(MemorySink::new());
    let layer = DedupLayer::builder()
        .with_sink(sink.clone())
        .with_exempt_targets(vec!["chat".to_string()])
        .with_background_sweep(false)
        .build()
        .unwrap();
    let capture = MockCaptureLayer::new();

    let subscriber =
        tracing_subscriber::registry().with(capture.clone().with_filter(layer.clone()));

    tracing::subscriber::with_default(subscriber, || {
        info!(target: "chat", "<Player> hello");
        info!("<Player> hello");
    });

    assert_eq!(capture.messages(), vec!["<Player> hello".to_string()]);
    assert_eq!(capture.get_captured()[0].target, "chat");
    assert_eq!(layer.metrics().records_filtered(), 1);
}

#[test]
fn test_exempt_match_is_exact() {
    let sink = Arc::new(MemorySink::new());
    let layer = DedupLayer::builder()
        .with_sink(sink.clone())
        .with_exempt_targets(vec!["app".to_string()])
        .with_background_sweep(false)
        .build()
        .unwrap();
    let capture = MockCaptureLayer::new();

    let subscriber =
        tracing_subscriber::registry().with(capture.clone().with_filter(layer.clone()));

    tracing::subscriber::with_default(subscriber, || {
        for _ in 0..3 {
            info!(target: "app::db", "Query slow");
        }
    });

    assert_eq!(capture.count(), 1);
    assert_eq!(layer.metrics().records_exempt(), 0);
}

#[test]
fn test_own_warnings_bypass_dedup() {
    let sink = Arc::new(MemorySink::new());
    let layer = DedupLayer::builder()
        .with_sink(sink.clone())
        .with_background_sweep(false)
        .build()
        .unwrap();
    let capture = MockCaptureLayer::new();

    let subscriber =
        tracing_subscriber::registry().with(capture.clone().with_filter(layer.clone()));

    sink.set_failing(true);
    tracing::subscriber::with_default(subscriber, || {
        for _ in 0..3 {
            info!("Flaky disk");
        }
        // Surfaces the deferred write failures
        layer.sweep_now();
        layer.sweep_now();
    });

    let events = capture.get_captured();
    assert_eq!(events[0].message, "Flaky disk");

    let warnings: Vec<_> = events
        .iter()
        .filter(|event| event.target.starts_with("tracing_dedup"))
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message, "failed to write summary lines");
    assert_eq!(layer.metrics().sink_failures(), 2);
}
