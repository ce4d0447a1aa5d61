use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;
use tracing_dedup::infrastructure::mocks::MockClock;
use tracing_dedup::{DedupLayer, LogSink, MessageFilter, SinkError, Timestamp};

/// Sink that discards everything, so benchmarks measure interception only.
#[derive(Debug)]
struct NullSink;

impl LogSink for NullSink {
    fn write_line(&self, line: &str) -> Result<(), SinkError> {
        black_box(line);
        Ok(())
    }

    fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

fn layer() -> DedupLayer {
    DedupLayer::builder()
        .with_sink(Arc::new(NullSink))
        .with_background_sweep(false)
        .build()
        .unwrap()
}

/// Benchmark the noise filter alone
fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");
    let filter = MessageFilter::default();

    for (name, text) in [
        ("pass", "Preparing spawn area: 42%"),
        ("command_echo", "Steve issued server command: /time set day"),
        ("chat", "<Player> hello"),
    ] {
        group.bench_function(name, |b| b.iter(|| filter.check(black_box(text))));
    }

    group.finish();
}

/// Benchmark single-threaded interception throughput
fn bench_single_threaded(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_threaded");
    group.throughput(Throughput::Elements(1000));

    // Every call after the first is a repeat
    group.bench_function("same_message", |b| {
        let layer = layer();
        b.iter(|| {
            for _ in 0..1000 {
                black_box(layer.intercept(black_box("Connection lost")));
            }
        })
    });

    group.bench_function("100_messages", |b| {
        let layer = layer();
        let messages: Vec<_> = (0..100).map(|i| format!("Message {}", i)).collect();
        b.iter(|| {
            for i in 0..1000 {
                black_box(layer.intercept(black_box(&messages[i % 100])));
            }
        })
    });

    group.bench_function("filtered", |b| {
        let layer = layer();
        b.iter(|| {
            for _ in 0..1000 {
                black_box(layer.intercept(black_box("<Player> hello")));
            }
        })
    });

    group.finish();
}

/// Benchmark multi-threaded concurrent throughput
fn bench_concurrent(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent");

    for num_threads in [2, 4, 8].iter() {
        group.throughput(Throughput::Elements((*num_threads as u64) * 1000));

        group.bench_with_input(
            BenchmarkId::new("shared_message", num_threads),
            num_threads,
            |b, &num_threads| {
                b.iter(|| {
                    let layer = layer();
                    let handles: Vec<_> = (0..num_threads)
                        .map(|_| {
                            let layer = layer.clone();
                            std::thread::spawn(move || {
                                for _ in 0..1000 {
                                    black_box(layer.intercept("Connection lost"));
                                }
                            })
                        })
                        .collect();

                    for handle in handles {
                        handle.join().unwrap();
                    }
                })
            },
        );
    }

    group.finish();
}

/// Benchmark sweeping a populated cache
fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");

    for num_messages in [100, 1000, 10_000].iter() {
        group.bench_with_input(
            BenchmarkId::new("expire_all", num_messages),
            num_messages,
            |b, &num_messages| {
                b.iter(|| {
                    let clock = MockClock::new(Timestamp::from_millis(0));
                    let layer = DedupLayer::builder()
                        .with_sink(Arc::new(NullSink))
                        .with_clock(Arc::new(clock.clone()))
                        .with_message_timeout(Duration::from_millis(1))
                        .with_background_sweep(false)
                        .build()
                        .unwrap();

                    for i in 0..num_messages {
                        let text = format!("Message {}", i);
                        layer.intercept(&text);
                        layer.intercept(&text);
                    }

                    clock.advance_millis(2);
                    black_box(layer.sweep_now())
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_filter,
    bench_single_threaded,
    bench_concurrent,
    bench_sweep
);
criterion_main!(benches);
