//! Cross-crate integration test helpers.
//!
//! Provides a harness that remembers every record it appended so the
//! whole log, archives included, can be checked afterwards.

use crate::fixtures::TestLog;
use crate::generators::LogOperation;
use logwriter_codec::LogRecord;
use logwriter_core::{Appended, LogResult};
use std::time::Duration;

/// A test harness for integration testing.
pub struct IntegrationHarness {
    /// The log under test.
    pub log: TestLog,
    /// Records in the order they were appended.
    appended: Vec<LogRecord>,
    /// Number of appends that rotated the active file.
    rotations: usize,
}

impl IntegrationHarness {
    /// Creates a harness whose active file lives for `lifetime`.
    pub fn new(lifetime: Duration) -> Self {
        Self {
            log: TestLog::with_lifetime(lifetime),
            appended: Vec::new(),
            rotations: 0,
        }
    }

    /// Appends a record and tracks it for later verification.
    pub fn append(&mut self, record: LogRecord) -> LogResult<Appended> {
        let appended = self.log.writer.append_record(&record)?;
        if appended.archived.is_some() {
            self.rotations += 1;
        }
        self.appended.push(record);
        Ok(appended)
    }

    /// Advances the fixture clock.
    pub fn advance(&self, secs: u64) {
        self.log.clock.advance(secs);
    }

    /// Applies a generated operation sequence.
    pub fn apply(&mut self, ops: &[LogOperation]) {
        for op in ops {
            match op {
                LogOperation::Append(record) => {
                    self.append(record.clone()).expect("Failed to append");
                }
                LogOperation::Advance { secs } => self.advance(*secs),
            }
        }
    }

    /// Verifies that archives plus the active file hold exactly the
    /// tracked records, in order, and that each rotation left one archive.
    pub fn verify_all(&self) {
        assert_eq!(
            self.log.archive_paths().len(),
            self.rotations,
            "Archive count does not match rotations"
        );
        assert_eq!(self.log.all_records(), self.appended, "Log content mismatch");
    }

    /// Returns the count of tracked records.
    pub fn tracked_count(&self) -> usize {
        self.appended.len()
    }

    /// Returns the number of rotations observed.
    pub fn rotations(&self) -> usize {
        self.rotations
    }
}

impl Default for IntegrationHarness {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

/// Writers coordinating through a file-backed store.
pub mod file_store {
    use crate::fixtures::{fast_config, read_records};
    use logwriter_core::LogWriter;
    use std::path::Path;

    /// Opens `writers` independent writers over `root/logs`, each with its
    /// own handle on a store in `root/store`, and appends `per_writer`
    /// records from each on its own thread. Returns the number of records
    /// read back from the active file.
    pub fn concurrent_appends(root: &Path, writers: usize, per_writer: usize) -> usize {
        let handles: Vec<_> = (0..writers)
            .map(|w| {
                let writer =
                    LogWriter::open_with_file_store(fast_config(root.join("logs")), &root.join("store"))
                        .expect("Failed to open writer");
                std::thread::spawn(move || {
                    for i in 0..per_writer {
                        writer
                            .append(&format!("w{w}"), Some(i as i64), "payload")
                            .expect("Failed to append");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("Writer thread panicked");
        }
        read_records(&root.join("logs").join("current-log")).len()
    }
}
