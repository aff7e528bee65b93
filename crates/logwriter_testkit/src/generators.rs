//! Property-based test generators using proptest.
//!
//! Provides strategies for generating records and legacy-charset input
//! that the writer must accept, plus the out-of-range ids it must reject.

use logwriter_codec::{LegacyCharset, LogRecord};
use proptest::prelude::*;

/// Strategy for generating table names.
pub fn table_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,31}").expect("Invalid regex")
}

/// Strategy for generating record ids, absent about a quarter of the time.
pub fn id_strategy() -> impl Strategy<Value = Option<u32>> {
    prop_oneof![
        1 => Just(None),
        3 => any::<u32>().prop_map(Some),
    ]
}

/// Strategy for ids the writer must reject.
pub fn invalid_id_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![i64::MIN..0i64, (i64::from(u32::MAX) + 1)..=i64::MAX]
}

/// Strategy for generating payloads, including multi-byte characters.
pub fn payload_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => ".{0,256}",
        1 => "[а-яА-Я ]{0,64}",
        1 => Just(String::new()),
    ]
}

/// Strategy for generating records.
pub fn record_strategy() -> impl Strategy<Value = LogRecord> {
    (table_strategy(), id_strategy(), payload_strategy())
        .prop_map(|(table, id, payload)| LogRecord::with_id(table, id, payload))
}

/// Strategy for windows-1251 input: any string the charset can represent,
/// paired with its encoded bytes.
pub fn windows_1251_strategy() -> impl Strategy<Value = (String, Vec<u8>)> {
    "[a-zA-Z0-9 а-яА-ЯёЁ.,!?-]{0,64}".prop_map(|s| {
        let bytes = LegacyCharset::WINDOWS_1251
            .encode(&s)
            .expect("Generated text is representable");
        (s, bytes)
    })
}

/// A single step driven against a writer.
#[derive(Debug, Clone)]
pub enum LogOperation {
    /// Append a record
    Append(LogRecord),
    /// Advance the clock
    Advance {
        /// Seconds to advance
        secs: u64,
    },
}

/// Strategy for generating log operations.
pub fn log_operation_strategy(max_advance: u64) -> impl Strategy<Value = LogOperation> {
    prop_oneof![
        4 => record_strategy().prop_map(LogOperation::Append),
        1 => (0..=max_advance).prop_map(|secs| LogOperation::Advance { secs }),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
    max_advance: u64,
) -> impl Strategy<Value = Vec<LogOperation>> {
    prop::collection::vec(log_operation_strategy(max_advance), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
