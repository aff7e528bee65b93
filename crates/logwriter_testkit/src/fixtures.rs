//! Test fixtures and writer helpers.
//!
//! Provides convenience functions for setting up a writer in a scratch
//! directory with a controllable clock.

use logwriter_codec::{decode_stream, LogRecord};
use logwriter_core::{Backoff, Config, LogWriter, ManualClock};
use logwriter_store::InMemoryStore;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Wall-clock second every fixture starts at (2023-11-14T22:13:20Z).
pub const FIXTURE_EPOCH: u64 = 1_700_000_000;

/// A writer over a temporary directory with automatic cleanup.
pub struct TestLog {
    /// The writer instance.
    pub writer: LogWriter,
    /// The store the writer's mutex lives in.
    pub store: InMemoryStore,
    /// The clock driving rotation.
    pub clock: Arc<ManualClock>,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl TestLog {
    /// Creates a test log with the default five-minute lifetime.
    pub fn new() -> Self {
        Self::with_lifetime(Duration::from_secs(300))
    }

    /// Creates a test log whose active file lives for `lifetime`.
    pub fn with_lifetime(lifetime: Duration) -> Self {
        Self::with_config(|config| config.file_lifetime(lifetime))
    }

    /// Creates a test log, letting `configure` adjust the configuration.
    ///
    /// Backoff ranges default to a few milliseconds so contended tests stay
    /// fast.
    pub fn with_config(configure: impl FnOnce(Config) -> Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = fast_config(temp_dir.path().join("logs"));
        let store = InMemoryStore::new();
        let clock = Arc::new(ManualClock::new(FIXTURE_EPOCH));
        let writer = LogWriter::open(configure(config), Arc::new(store.clone()))
            .expect("Failed to open writer")
            .with_clock(clock.clone());

        Self {
            writer,
            store,
            clock,
            temp_dir,
        }
    }

    /// Opens another writer against the same directory and store, as a
    /// second process would.
    pub fn sibling(&self) -> LogWriter {
        LogWriter::open(self.writer.config().clone(), Arc::new(self.store.clone()))
            .expect("Failed to open sibling writer")
            .with_clock(self.clock.clone())
    }

    /// Returns the scratch root (the log directory's parent).
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Returns the active file path.
    pub fn active_path(&self) -> PathBuf {
        self.writer.dir().active_path()
    }

    /// Decodes every record in the active file.
    pub fn active_records(&self) -> Vec<LogRecord> {
        read_records(&self.active_path())
    }

    /// Returns archive paths in name order.
    pub fn archive_paths(&self) -> Vec<PathBuf> {
        let dir = self.writer.dir();
        dir.list_archives()
            .expect("Failed to list archives")
            .into_iter()
            .map(|name| dir.path().join(name))
            .collect()
    }

    /// Decodes every archive followed by the active file.
    pub fn all_records(&self) -> Vec<LogRecord> {
        let mut records: Vec<_> = self
            .archive_paths()
            .iter()
            .flat_map(|p| read_records(p))
            .collect();
        if self.active_path().exists() {
            records.extend(self.active_records());
        }
        records
    }
}

impl Default for TestLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns a configuration for `dir` with millisecond backoff ranges.
pub fn fast_config(dir: impl Into<PathBuf>) -> Config {
    Config::new(dir)
        .mutex_backoff(Backoff::from_millis(1, 5))
        .lock_backoff(Backoff::from_millis(1, 5))
}

/// Decodes the log file at `path`, panicking on any malformed byte.
pub fn read_records(path: &Path) -> Vec<LogRecord> {
    let bytes = fs::read(path).expect("Failed to read log file");
    decode_stream(&bytes).expect("Log file is malformed")
}

/// Runs a test with a temporary log.
///
/// # Example
///
/// ```rust,ignore
/// use logwriter_testkit::with_temp_log;
///
/// #[test]
/// fn my_test() {
///     with_temp_log(|log| {
///         log.writer.append("t", None, "p").unwrap();
///     });
/// }
/// ```
pub fn with_temp_log<F, R>(f: F) -> R
where
    F: FnOnce(&TestLog) -> R,
{
    let log = TestLog::new();
    f(&log)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates a log whose active file holds `count` records.
    pub fn populated_log(count: usize) -> TestLog {
        let log = TestLog::new();
        for i in 0..count {
            log.writer
                .append("test", Some(i as i64), &format!(r#"{{"index":{i}}}"#))
                .expect("Failed to append");
        }
        log
    }

    /// Creates a log that has rotated `archives` times, one record per file.
    pub fn rotated_log(archives: usize) -> TestLog {
        let log = TestLog::with_lifetime(Duration::from_secs(60));
        for i in 0..=archives {
            log.writer
                .append("test", Some(i as i64), "x")
                .expect("Failed to append");
            log.clock.advance(60);
        }
        log
    }
}
