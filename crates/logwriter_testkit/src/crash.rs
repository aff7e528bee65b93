//! Crash simulation for the log writer.
//!
//! A writer process can die at any point of the append protocol. These
//! helpers reproduce the states it leaves behind and check what the next
//! writer or reader makes of them.
//!
//! ## Scenarios
//!
//! 1. **Torn record** - the process died mid-write
//! 2. **Abandoned mutex** - the process died holding the mutex
//! 3. **Lost marker** - the process died after creating the active file
//!    but before writing the rotation marker

use crate::fixtures::{fast_config, TestLog};
use logwriter_codec::{encode, LogRecord, RecordDecoder};
use logwriter_core::{CrossProcessMutex, LogWriter, Ticket};
use logwriter_store::{InMemoryStore, SharedStore};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of a crash scenario.
#[derive(Debug, Clone)]
pub struct CrashRecoveryResult {
    /// Whether the scenario behaved as expected.
    pub passed: bool,
    /// What was tested.
    pub description: String,
    /// Any error message.
    pub error: Option<String>,
}

impl CrashRecoveryResult {
    fn pass(description: &str) -> Self {
        Self {
            passed: true,
            description: description.into(),
            error: None,
        }
    }

    fn fail(description: &str, error: impl Into<String>) -> Self {
        Self {
            passed: false,
            description: description.into(),
            error: Some(error.into()),
        }
    }
}

/// Splits a log image into its whole records and whether a torn tail
/// follows them.
pub fn readable_prefix(bytes: &[u8]) -> (Vec<LogRecord>, bool) {
    let mut decoder = RecordDecoder::new(bytes);
    if decoder.decode_header().is_err() {
        return (Vec::new(), !bytes.is_empty());
    }
    let mut records = Vec::new();
    for result in decoder {
        match result {
            Ok(record) => records.push(record),
            Err(_) => return (records, true),
        }
    }
    (records, false)
}

/// Appends `whole` records, then writes the first `torn_bytes` of one more
/// record directly, as a writer killed mid-write would leave the file.
pub fn torn_record(whole: usize, torn_bytes: usize) -> CrashRecoveryResult {
    let description = "Torn record is detected and earlier records survive";
    let log = TestLog::new();
    for i in 0..whole {
        if let Err(e) = log.writer.append("t", Some(i as i64), "whole") {
            return CrashRecoveryResult::fail(description, e.to_string());
        }
    }

    let torn = encode(&LogRecord::with_id("t", None, "torn record payload"))
        .expect("Literal record must encode");
    let cut = torn_bytes.min(torn.len().saturating_sub(1));
    let mut file = match OpenOptions::new().append(true).open(log.active_path()) {
        Ok(file) => file,
        Err(e) => return CrashRecoveryResult::fail(description, e.to_string()),
    };
    if let Err(e) = file.write_all(&torn[..cut]) {
        return CrashRecoveryResult::fail(description, e.to_string());
    }

    let bytes = match fs::read(log.active_path()) {
        Ok(bytes) => bytes,
        Err(e) => return CrashRecoveryResult::fail(description, e.to_string()),
    };
    let (records, torn_tail) = readable_prefix(&bytes);
    if records.len() != whole {
        return CrashRecoveryResult::fail(
            description,
            format!("expected {whole} records, read {}", records.len()),
        );
    }
    if torn_tail != (cut > 0) {
        return CrashRecoveryResult::fail(description, "torn tail not reported");
    }
    CrashRecoveryResult::pass(description)
}

/// Leaves a mutex ticket behind with a short TTL and checks that a writer
/// gets through once it expires.
pub fn abandoned_mutex(ttl: Duration) -> CrashRecoveryResult {
    let description = "Writer proceeds after an abandoned mutex expires";
    let temp = match tempfile::TempDir::new() {
        Ok(temp) => temp,
        Err(e) => return CrashRecoveryResult::fail(description, e.to_string()),
    };
    let store = InMemoryStore::new();
    let config = fast_config(temp.path()).mutex_ttl(ttl);

    let crashed = CrossProcessMutex::new(
        Arc::new(store.clone()),
        &config.mutex_name,
        ttl,
        config.mutex_backoff,
    );
    let key = crashed.key().to_string();
    let start = Instant::now();
    if let Err(e) = store.set_with_expiry(&key, Ticket::generate().as_str(), ttl) {
        return CrashRecoveryResult::fail(description, e.to_string());
    }

    let writer = match LogWriter::open(config, Arc::new(store.clone())) {
        Ok(writer) => writer,
        Err(e) => return CrashRecoveryResult::fail(description, e.to_string()),
    };
    if let Err(e) = writer.append("t", None, "after crash") {
        return CrashRecoveryResult::fail(description, e.to_string());
    }
    if start.elapsed() < ttl {
        return CrashRecoveryResult::fail(description, "appended before the ticket expired");
    }
    CrashRecoveryResult::pass(description)
}

/// Deletes the rotation marker after the first append and checks that the
/// next append archives the unmarked file instead of trusting it.
pub fn lost_marker() -> CrashRecoveryResult {
    let description = "Active file without a marker is rotated";
    let log = TestLog::new();
    if let Err(e) = log.writer.append("t", Some(1), "before") {
        return CrashRecoveryResult::fail(description, e.to_string());
    }
    if let Err(e) = fs::remove_file(log.writer.dir().marker_path()) {
        return CrashRecoveryResult::fail(description, e.to_string());
    }

    let appended = match log.writer.append("t", Some(2), "after") {
        Ok(appended) => appended,
        Err(e) => return CrashRecoveryResult::fail(description, e.to_string()),
    };
    if appended.archived.is_none() {
        return CrashRecoveryResult::fail(description, "no rotation happened");
    }
    if log.all_records().len() != 2 {
        return CrashRecoveryResult::fail(description, "records lost across rotation");
    }
    CrashRecoveryResult::pass(description)
}

/// Runs every scenario.
pub fn run_all() -> Vec<CrashRecoveryResult> {
    vec![
        torn_record(3, 7),
        abandoned_mutex(Duration::from_millis(100)),
        lost_marker(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use logwriter_codec::encode_header;

    #[test]
    fn test_torn_record_at_every_offset() {
        for cut in 0..20 {
            let result = torn_record(2, cut);
            assert!(result.passed, "cut {cut}: {:?}", result.error);
        }
    }

    #[test]
    fn test_abandoned_mutex() {
        let result = abandoned_mutex(Duration::from_millis(100));
        assert!(result.passed, "{:?}", result.error);
    }

    #[test]
    fn test_lost_marker() {
        let result = lost_marker();
        assert!(result.passed, "{:?}", result.error);
    }

    #[test]
    fn test_run_all() {
        assert!(run_all().iter().all(|r| r.passed));
    }

    #[test]
    fn test_readable_prefix_of_header_only() {
        assert_eq!(readable_prefix(&encode_header()), (Vec::new(), false));
        assert_eq!(readable_prefix(&[0, 0]), (Vec::new(), true));
    }
}
