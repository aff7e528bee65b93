//! Benchmark utilities.

use logwriter_codec::{LegacyCharset, LogRecord};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Generate a random ASCII payload of the specified size.
pub fn random_payload(size: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(size)
        .map(char::from)
        .collect()
}

/// Generate a windows-1251 payload of the specified size in bytes.
///
/// Bytes are drawn from the Cyrillic block (0xC0..=0xFF), which maps to
/// two-byte UTF-8 characters.
pub fn random_windows_1251(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen_range(0xC0..=0xFF)).collect()
}

/// Generate records with the specified payload size.
pub fn generate_records(count: usize, payload_size: usize) -> Vec<LogRecord> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            let id = if rng.gen_bool(0.75) { Some(rng.gen()) } else { None };
            LogRecord::with_id(format!("table_{}", i % 8), id, random_payload(payload_size))
        })
        .collect()
}

/// The charset legacy benchmarks decode from.
pub const BENCH_CHARSET: LegacyCharset = LegacyCharset::WINDOWS_1251;
