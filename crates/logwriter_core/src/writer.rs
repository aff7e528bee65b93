//! The append entry point.
//!
//! Each [`LogWriter::append`] call runs the full protocol:
//!
//! ```text
//! encode ─► mutex.acquire ─► rotation ─► open + flock ─► write + flush
//!                                         │
//!        mutex.release ◄── close ◄── unlock
//! ```
//!
//! Nothing is kept between calls except the configuration. Encoding
//! happens first, so a rejected record never touches the filesystem or
//! the store.

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::dir::LogDir;
use crate::error::LogResult;
use crate::file_lock::LockedFile;
use crate::rotation::RotationManager;
use crate::semaphore::CrossProcessMutex;
use bytes::BytesMut;
use logwriter_codec::{encode_into, LogRecord};
use logwriter_store::{FileStore, SharedStore};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Where a record landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appended {
    /// Byte offset of the record within the active file.
    pub offset: u64,
    /// Encoded record length in bytes.
    pub len: usize,
    /// The archive the previous active file was renamed to, if this call
    /// rotated it.
    pub archived: Option<PathBuf>,
}

/// Appends records to a rotating binary log.
///
/// A `LogWriter` is `Send + Sync`; share one across threads with an `Arc`,
/// or open one per process against the same directory and store.
///
/// # Example
///
/// ```no_run
/// use logwriter_core::{Config, LogWriter};
/// use logwriter_store::InMemoryStore;
/// use std::sync::Arc;
///
/// let writer = LogWriter::open(Config::new("/var/log/app"), Arc::new(InMemoryStore::new()))?;
/// writer.append("users", None, "hello")?;
/// writer.append("orders", Some(42), "created")?;
/// # Ok::<(), logwriter_core::LogError>(())
/// ```
pub struct LogWriter {
    config: Config,
    rotation: RotationManager,
    mutex: CrossProcessMutex,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogWriter")
            .field("config", &self.config)
            .field("mutex", &self.mutex)
            .finish_non_exhaustive()
    }
}

impl LogWriter {
    /// Opens a writer coordinating through `store`.
    ///
    /// No files are touched until the first append.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LogError::InvalidConfig`] if the configuration does
    /// not validate.
    pub fn open(config: Config, store: Arc<dyn SharedStore>) -> LogResult<Self> {
        config.validate()?;

        let dir = LogDir::new(&config.dir, &config.extension);
        let rotation = RotationManager::new(dir, &config.archive_pattern, config.file_lifetime);
        let mutex = CrossProcessMutex::new(
            store,
            &config.mutex_name,
            config.mutex_ttl,
            config.mutex_backoff,
        );

        Ok(Self {
            config,
            rotation,
            mutex,
            clock: Arc::new(SystemClock),
        })
    }

    /// Opens a writer that coordinates with other processes through a
    /// [`FileStore`] rooted at `store_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store directory cannot be created or the
    /// configuration does not validate.
    pub fn open_with_file_store(config: Config, store_dir: &Path) -> LogResult<Self> {
        let store = FileStore::open(store_dir)?;
        Self::open(config, Arc::new(store))
    }

    /// Replaces the wall clock used for rotation decisions.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the directory layout.
    #[must_use]
    pub fn dir(&self) -> &LogDir {
        self.rotation.dir()
    }

    /// Appends a record whose strings are already UTF-8.
    ///
    /// # Errors
    ///
    /// - [`crate::LogError::InvalidArgument`] if `id` is negative or exceeds
    ///   `u32::MAX`; nothing is written
    /// - [`crate::LogError::Io`] or [`crate::LogError::Store`] if any step of
    ///   the protocol fails
    pub fn append(&self, table: &str, id: Option<i64>, payload: &str) -> LogResult<Appended> {
        let record = LogRecord::new(table, id, payload)?;
        self.append_record(&record)
    }

    /// Appends a record whose strings are in the configured legacy charset.
    ///
    /// # Errors
    ///
    /// As [`LogWriter::append`], plus
    /// [`crate::LogError::InvalidArgument`] for bytes the charset cannot
    /// map.
    pub fn append_legacy(
        &self,
        table: &[u8],
        id: Option<i64>,
        payload: &[u8],
    ) -> LogResult<Appended> {
        let record = LogRecord::from_legacy(table, id, payload, self.config.source_charset)?;
        self.append_record(&record)
    }

    /// Appends a prepared record.
    ///
    /// # Errors
    ///
    /// As [`LogWriter::append`]. When both the write and the mutex release
    /// fail, the write error is returned.
    pub fn append_record(&self, record: &LogRecord) -> LogResult<Appended> {
        let mut buf = BytesMut::with_capacity(record.encoded_len());
        encode_into(record, &mut buf)?;

        let ticket = self.mutex.acquire()?;
        let written = self.write_locked(&buf);
        let released = self.mutex.release(&ticket);

        let appended = written?;
        released?;
        debug!(
            table = %record.table,
            offset = appended.offset,
            len = appended.len,
            "appended record"
        );
        Ok(appended)
    }

    fn write_locked(&self, data: &[u8]) -> LogResult<Appended> {
        let outcome = self
            .rotation
            .ensure_current_file(self.clock.now_secs())?;

        let file = OpenOptions::new()
            .append(true)
            .open(self.rotation.dir().active_path())?;
        let mut locked = LockedFile::acquire(file, &self.config.lock_backoff)?;

        let offset = locked.file().metadata()?.len();
        locked.write_all_and_flush(data)?;
        if self.config.sync_on_append {
            locked.file().sync_data()?;
        }
        locked.unlock()?;

        Ok(Appended {
            offset,
            len: data.len(),
            archived: outcome.archived,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::Backoff;
    use crate::clock::ManualClock;
    use crate::error::LogError;
    use logwriter_codec::{decode_stream, CodecError, HEADER_SIZE};
    use logwriter_store::InMemoryStore;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    const T0: u64 = 1_700_000_000;

    fn writer(dir: &Path, lifetime: u64) -> (LogWriter, Arc<ManualClock>, InMemoryStore) {
        let store = InMemoryStore::new();
        let clock = Arc::new(ManualClock::new(T0));
        let config = Config::new(dir)
            .file_lifetime(Duration::from_secs(lifetime))
            .mutex_backoff(Backoff::from_millis(1, 5))
            .lock_backoff(Backoff::from_millis(1, 5));
        let writer = LogWriter::open(config, Arc::new(store.clone()))
            .unwrap()
            .with_clock(clock.clone());
        (writer, clock, store)
    }

    #[test]
    fn first_append_writes_header_and_record() {
        let temp = tempdir().unwrap();
        let (w, _, store) = writer(temp.path(), 300);

        let appended = w.append("users", None, "hello").unwrap();
        assert_eq!(appended.offset, HEADER_SIZE as u64);
        assert_eq!(appended.len, 19);
        assert_eq!(appended.archived, None);

        let mut expected = vec![0, 0, 0, 1, 0, 0, 0, 5];
        expected.extend_from_slice(b"users");
        expected.push(0);
        expected.extend_from_slice(&[0, 0, 0, 5]);
        expected.extend_from_slice(b"hello");
        assert_eq!(fs::read(w.dir().active_path()).unwrap(), expected);

        // Mutex released
        assert!(store.is_empty());
    }

    #[test]
    fn unbounded_mutex_ttl_appends_and_releases() {
        let temp = tempdir().unwrap();
        let store = InMemoryStore::new();
        let config = Config::new(temp.path())
            .mutex_ttl(Duration::MAX)
            .mutex_backoff(Backoff::from_millis(1, 5))
            .lock_backoff(Backoff::from_millis(1, 5));
        let w = LogWriter::open(config, Arc::new(store.clone())).unwrap();

        w.append("users", Some(1), "a").unwrap();
        w.append("users", Some(2), "b").unwrap();

        let bytes = fs::read(w.dir().active_path()).unwrap();
        assert_eq!(decode_stream(&bytes).unwrap().len(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn invalid_id_writes_nothing() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("logs");
        let (w, _, _) = writer(&root, 300);

        let err = w.append("users", Some(-1), "x").unwrap_err();
        assert!(matches!(
            err,
            LogError::InvalidArgument(CodecError::InvalidId(-1))
        ));
        assert!(!root.exists());
    }

    #[test]
    fn appends_accumulate_within_lifetime() {
        let temp = tempdir().unwrap();
        let (w, clock, _) = writer(temp.path(), 300);

        let first = w.append("a", Some(1), "one").unwrap();
        clock.advance(100);
        let second = w.append("b", Some(2), "two").unwrap();
        assert_eq!(second.offset, first.offset + first.len as u64);

        let records = decode_stream(&fs::read(w.dir().active_path()).unwrap()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], LogRecord::with_id("b", Some(2), "two"));
    }

    #[test]
    fn zero_lifetime_rotates_between_appends() {
        let temp = tempdir().unwrap();
        let (w, clock, _) = writer(temp.path(), 0);

        assert_eq!(w.append("orders", Some(42), "x").unwrap().archived, None);
        clock.advance(1);
        let second = w.append("orders", Some(42), "x").unwrap();

        let archived = second.archived.unwrap();
        assert_eq!(w.dir().list_archives().unwrap().len(), 1);

        let old = decode_stream(&fs::read(&archived).unwrap()).unwrap();
        let new = decode_stream(&fs::read(w.dir().active_path()).unwrap()).unwrap();
        let expected = LogRecord::with_id("orders", Some(42), "x");
        assert_eq!(old, vec![expected.clone()]);
        assert_eq!(new, vec![expected]);
    }

    #[test]
    fn legacy_input_is_transcoded() {
        let temp = tempdir().unwrap();
        let (w, _, _) = writer(temp.path(), 300);

        // "лог" in windows-1251
        w.append_legacy(b"t", None, &[0xEB, 0xEE, 0xE3]).unwrap();
        let records = decode_stream(&fs::read(w.dir().active_path()).unwrap()).unwrap();
        assert_eq!(records[0].payload, "лог");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = Config::new("/tmp/x").archive_pattern("%Y/%m");
        let result = LogWriter::open(config, Arc::new(InMemoryStore::new()));
        assert!(matches!(result, Err(LogError::InvalidConfig { .. })));
    }

    #[test]
    fn mutex_released_when_write_fails() {
        let temp = tempdir().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"file").unwrap();
        let (w, _, store) = writer(&blocker.join("logs"), 300);

        assert!(matches!(w.append("t", None, "p"), Err(LogError::Io(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn sync_on_append_still_writes() {
        let temp = tempdir().unwrap();
        let config = Config::new(temp.path()).sync_on_append(true);
        let w = LogWriter::open(config, Arc::new(InMemoryStore::new())).unwrap();
        w.append("t", None, "p").unwrap();
        let records = decode_stream(&fs::read(w.dir().active_path()).unwrap()).unwrap();
        assert_eq!(records, vec![LogRecord::with_id("t", None, "p")]);
    }

    #[test]
    fn file_store_coordination() {
        let temp = tempdir().unwrap();
        let config = Config::new(temp.path().join("logs"));
        let w = LogWriter::open_with_file_store(config, &temp.path().join("store")).unwrap();
        w.append("t", Some(7), "p").unwrap();
        assert!(temp.path().join("store").is_dir());
        assert!(!FileStore::open(&temp.path().join("store"))
            .unwrap()
            .exists("semaphore-log-writer")
            .unwrap());
    }

    #[test]
    fn concurrent_writers_never_interleave() {
        let temp = tempdir().unwrap();
        let store = InMemoryStore::new();
        let threads = 4;
        let per_thread = 25;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                // One writer per thread stands in for one process
                let config = Config::new(temp.path())
                    .mutex_backoff(Backoff::from_millis(0, 2))
                    .lock_backoff(Backoff::from_millis(0, 2));
                let w = LogWriter::open(config, Arc::new(store.clone())).unwrap();
                std::thread::spawn(move || {
                    for i in 0..per_thread {
                        w.append(&format!("t{t}"), Some(i), &"x".repeat(i as usize))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let path = temp.path().join("current-log");
        let records = decode_stream(&fs::read(path).unwrap()).unwrap();
        assert_eq!(records.len(), threads * per_thread as usize);
        for t in 0..threads {
            let table = format!("t{t}");
            let ids: Vec<_> = records
                .iter()
                .filter(|r| r.table == table)
                .map(|r| r.id.unwrap())
                .collect();
            assert_eq!(ids, (0..per_thread as u32).collect::<Vec<_>>());
        }
    }
}
