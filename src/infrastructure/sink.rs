//! File-backed summary sink.
//!
//! Lines are appended through a buffered writer that is flushed after every
//! line, trading batching for durability. A mutex serializes writers so
//! concurrent lines never interleave.

use crate::application::ports::{LogSink, SinkError};
use crate::domain::record::{Timestamp, FILE_TIMESTAMP_FORMAT};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Append-only file sink.
///
/// # Example
/// ```no_run
/// use tracing_dedup::{FileSink, LogSink};
///
/// let sink = FileSink::open("logs/duplicates.txt").expect("cannot open sink");
/// sink.write_line("[2x] Connection lost").unwrap();
/// sink.close().unwrap();
/// ```
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl FileSink {
    /// Open `path` for appending, creating missing parent directories.
    ///
    /// # Errors
    /// Returns `SinkError::Io` if the directory or file cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(Some(BufWriter::new(file))),
        })
    }

    /// Create `console_log_{YYYY-MM-DD_HH-MM-SS}.txt` inside `dir`.
    ///
    /// The directory is created if missing.
    ///
    /// # Errors
    /// Returns `SinkError::Io` if the directory or file cannot be created.
    pub fn create_in(dir: impl AsRef<Path>, started: Timestamp) -> Result<Self, SinkError> {
        let file_name = format!(
            "console_log_{}.txt",
            started.format_local(FILE_TIMESTAMP_FORMAT)
        );
        Self::open(dir.as_ref().join(file_name))
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> MutexGuard<'_, Option<BufWriter<File>>> {
        // A panicking writer leaves at worst a partial line behind
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LogSink for FileSink {
    fn write_line(&self, line: &str) -> Result<(), SinkError> {
        let mut guard = self.lock();
        let writer = guard.as_mut().ok_or(SinkError::Closed)?;

        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    fn close(&self) -> Result<(), SinkError> {
        let writer = self.lock().take();

        match writer {
            Some(mut writer) => {
                writer.flush()?;
                writer.get_ref().sync_all()?;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let sink = FileSink::open(&path).unwrap();

        sink.write_line("[2x] Connection lost").unwrap();
        sink.write_line("[3x] Connection lost").unwrap();

        // Flushed per line, readable before close
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "[2x] Connection lost\n[3x] Connection lost\n");
    }

    #[test]
    fn test_open_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "earlier\n").unwrap();

        let sink = FileSink::open(&path).unwrap();
        sink.write_line("later").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "earlier\nlater\n");
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("out.txt");

        let sink = FileSink::open(&path).unwrap();
        assert_eq!(sink.path(), path.as_path());
        assert!(path.exists());
    }

    #[test]
    fn test_create_in_names_file_by_start_time() {
        let dir = tempfile::tempdir().unwrap();
        let started = Timestamp::from_millis(1_700_000_000_000);

        let sink = FileSink::create_in(dir.path().join("plugin"), started).unwrap();
        let name = sink.path().file_name().unwrap().to_string_lossy().into_owned();

        assert_eq!(
            name,
            format!(
                "console_log_{}.txt",
                started.format_local(FILE_TIMESTAMP_FORMAT)
            )
        );
        assert!(name.starts_with("console_log_"));
    }

    #[test]
    fn test_open_fails_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let result = FileSink::open(blocker.join("out.txt"));
        assert!(matches!(result, Err(SinkError::Io(_))));
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::open(dir.path().join("out.txt")).unwrap();

        sink.write_line("before").unwrap();
        sink.close().unwrap();
        sink.close().unwrap();

        assert!(sink.is_closed());
        assert!(matches!(sink.write_line("after"), Err(SinkError::Closed)));
    }

    #[test]
    fn test_concurrent_writes_do_not_interleave() {
        use std::sync::Arc;
        use std::thread;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let sink = Arc::new(FileSink::open(&path).unwrap());
        let mut handles = vec![];

        for i in 0..8 {
            let sink = Arc::clone(&sink);
            handles.push(thread::spawn(move || {
                for j in 0..50 {
                    sink.write_line(&format!("writer {} line {}", i, j)).unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 400);
        assert!(lines.iter().all(|l| l.starts_with("writer ")));
    }
}
