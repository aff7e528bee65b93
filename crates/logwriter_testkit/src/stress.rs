//! Stress runners for the log writer.
//!
//! These drive many appends, optionally from many writers at once, and
//! report throughput along with whether the result decoded cleanly.

use crate::fixtures::{fast_config, TestLog};
use logwriter_core::LogWriter;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Records read back from the log afterwards.
    pub records_read: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, records_read: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            records_read,
            duration,
            ops_per_second,
        }
    }

    /// Returns true if every append succeeded and every record was read back.
    pub fn is_clean(&self) -> bool {
        self.failed_ops == 0 && self.records_read == self.successful_ops
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {name} ===");
        println!("Total appends: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Read back: {}", self.records_read);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} appends/sec", self.ops_per_second);
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of appends per writer.
    pub operations: usize,
    /// Number of concurrent writers.
    pub threads: usize,
    /// Payload size in bytes.
    pub payload_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 1_000,
            threads: 4,
            payload_size: 256,
        }
    }
}

/// Appends `operations` records from a single writer.
pub fn stress_sequential_appends(config: &StressConfig) -> StressTestResult {
    let log = TestLog::new();
    let payload = "x".repeat(config.payload_size);

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        match log.writer.append("stress", Some(i as i64), &payload) {
            Ok(_) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    let duration = start.elapsed();
    StressTestResult::new(successful, failed, log.all_records().len(), duration)
}

/// Appends from `threads` independent writers sharing one store, as
/// separate processes would.
pub fn stress_concurrent_appends(config: &StressConfig) -> StressTestResult {
    let log = TestLog::new();
    let payload = Arc::new("x".repeat(config.payload_size));
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let writer = log.sibling();
            let payload = Arc::clone(&payload);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let operations = config.operations;

            thread::spawn(move || {
                for i in 0..operations {
                    match writer.append(&format!("thread_{t}"), Some(i as i64), &payload) {
                        Ok(_) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let duration = start.elapsed();
    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        log.all_records().len(),
        duration,
    )
}

/// Appends from one writer shared by `threads` threads through an `Arc`.
pub fn stress_shared_writer(config: &StressConfig) -> StressTestResult {
    let temp = tempfile::TempDir::new().expect("Failed to create temp directory");
    let writer = Arc::new(
        LogWriter::open(
            fast_config(temp.path()),
            Arc::new(logwriter_store::InMemoryStore::new()),
        )
        .expect("Failed to open writer"),
    );
    let payload = "x".repeat(config.payload_size);

    let start = Instant::now();
    let results: Vec<(usize, usize)> = thread::scope(|s| {
        let handles: Vec<_> = (0..config.threads)
            .map(|t| {
                let writer = Arc::clone(&writer);
                let payload = payload.as_str();
                s.spawn(move || {
                    let mut ok = 0;
                    let mut err = 0;
                    for i in 0..config.operations {
                        match writer.append(&format!("thread_{t}"), Some(i as i64), payload) {
                            Ok(_) => ok += 1,
                            Err(_) => err += 1,
                        }
                    }
                    (ok, err)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("Thread panicked"))
            .collect()
    });
    let duration = start.elapsed();

    let successful = results.iter().map(|r| r.0).sum();
    let failed = results.iter().map(|r| r.1).sum();
    let records = crate::fixtures::read_records(&writer.dir().active_path()).len();
    StressTestResult::new(successful, failed, records, duration)
}

/// Appends while the clock advances one lifetime every `rotate_every`
/// appends, so the run spans many rotations.
pub fn stress_rotating_appends(config: &StressConfig, rotate_every: usize) -> StressTestResult {
    let log = TestLog::with_lifetime(Duration::from_secs(60));
    let payload = "x".repeat(config.payload_size);

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        if i > 0 && i % rotate_every.max(1) == 0 {
            log.clock.advance(60);
        }
        match log.writer.append("rotating", Some(i as i64), &payload) {
            Ok(_) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    let duration = start.elapsed();
    StressTestResult::new(successful, failed, log.all_records().len(), duration)
}
