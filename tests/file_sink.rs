//! End-to-end tests writing summaries to real files.

use std::fs;
use std::sync::Arc;
use tracing_dedup::infrastructure::mocks::MockClock;
use tracing_dedup::{BuildError, DedupLayer, FileSink, LogSink, SinkError, Timestamp};

#[test]
fn test_log_directory_creates_timestamped_file() {
    let dir = tempfile::tempdir().unwrap();
    let logs = dir.path().join("logs");
    let clock = MockClock::new(Timestamp::from_millis(1_714_564_800_000));

    let layer = DedupLayer::builder()
        .with_log_directory(&logs)
        .with_clock(Arc::new(clock.clone()))
        .with_background_sweep(false)
        .build()
        .unwrap();

    layer.intercept("Connection lost");
    layer.intercept("Connection lost");
    layer.intercept("Connection lost");
    clock.advance_millis(300_001);
    layer.sweep_now();
    layer.close_sink();

    let entries: Vec<_> = fs::read_dir(&logs)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(entries.len(), 1);

    let name = &entries[0];
    assert!(name.starts_with("console_log_"));
    assert!(name.ends_with(".txt"));
    // console_log_YYYY-MM-DD_HH-MM-SS.txt
    assert_eq!(name.len(), "console_log_".len() + 19 + ".txt".len());

    let contents = fs::read_to_string(logs.join(name)).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("] [2x] Connection lost"));
    assert!(lines[1].ends_with("] [3x] Connection lost"));
    assert!(lines[2].ends_with("] [ИТОГ] Сообщение 'Connection lost' повторялось 3 раз"));
    assert!(lines.iter().all(|line| line.starts_with('[')));
}

#[test]
fn test_log_file_appends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("summary.txt");
    fs::write(&path, "previous run\n").unwrap();

    let layer = DedupLayer::builder()
        .with_log_file(&path)
        .with_background_sweep(false)
        .build()
        .unwrap();

    layer.intercept("Tick");
    layer.intercept("Tick");
    layer.close_sink();

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("previous run\n"));
    assert!(contents.trim_end().ends_with("[2x] Tick"));
}

#[test]
fn test_unwritable_location_fails_build() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-directory");
    fs::write(&blocker, "file").unwrap();

    let result = DedupLayer::builder()
        .with_log_directory(blocker.join("logs"))
        .with_background_sweep(false)
        .build();

    assert!(matches!(result, Err(BuildError::Sink(SinkError::Io(_)))));
}

#[test]
fn test_closed_file_sink_rejects_writes() {
    let dir = tempfile::tempdir().unwrap();
    let sink = FileSink::open(dir.path().join("out.txt")).unwrap();

    sink.close().unwrap();
    sink.close().unwrap();

    assert!(sink.is_closed());
    assert!(matches!(sink.write_line("late"), Err(SinkError::Closed)));
}
