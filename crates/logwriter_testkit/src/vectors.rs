//! Shareable test vectors for the log file format.
//!
//! Readers written in other languages can load these as JSON and check
//! themselves against the same bytes.

use crate::golden::{hex_decode, hex_encode};
use logwriter_codec::{decode, decode_header, encode, LogRecord};
use serde::{Deserialize, Serialize};

/// A record as it appears in a vector file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Table name.
    pub table: String,
    /// Optional id.
    pub id: Option<u32>,
    /// Payload text.
    pub payload: String,
}

impl From<&LogRecord> for VectorRecord {
    fn from(record: &LogRecord) -> Self {
        Self {
            table: record.table.clone(),
            id: record.id,
            payload: record.payload.clone(),
        }
    }
}

impl From<&VectorRecord> for LogRecord {
    fn from(v: &VectorRecord) -> Self {
        LogRecord::with_id(v.table.clone(), v.id, v.payload.clone())
    }
}

/// What a vector expects from its bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expectation {
    /// The bytes are exactly one encoded record.
    Record {
        /// The decoded record.
        record: VectorRecord,
    },
    /// The bytes are a valid file header.
    Header {
        /// The format version.
        version: u32,
    },
    /// Decoding the bytes as a record must fail.
    RecordError {
        /// Human-readable reason.
        reason: String,
    },
    /// Decoding the bytes as a header must fail.
    HeaderError {
        /// Human-readable reason.
        reason: String,
    },
}

/// A single named vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// The bytes under test (hex-encoded).
    pub hex: String,
    /// What decoding the bytes must produce.
    pub expect: Expectation,
}

impl TestVector {
    fn record(id: &str, description: &str, record: LogRecord) -> Self {
        let bytes = encode(&record).expect("Vector records must encode");
        Self {
            id: id.into(),
            description: description.into(),
            hex: hex_encode(&bytes),
            expect: Expectation::Record {
                record: VectorRecord::from(&record),
            },
        }
    }

    fn record_error(id: &str, description: &str, hex: &str) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            hex: hex.into(),
            expect: Expectation::RecordError {
                reason: description.into(),
            },
        }
    }

    /// Checks the vector against the codec.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first mismatch.
    pub fn verify(&self) -> Result<(), String> {
        let bytes = hex_decode(&self.hex);
        match &self.expect {
            Expectation::Record { record } => {
                let expected = LogRecord::from(record);
                let (decoded, consumed) = decode(&bytes).map_err(|e| format!("{}: {e}", self.id))?;
                if decoded != expected || consumed != bytes.len() {
                    return Err(format!("{}: decoded {decoded:?} ({consumed} bytes)", self.id));
                }
                let reencoded = encode(&expected).map_err(|e| format!("{}: {e}", self.id))?;
                if reencoded != bytes {
                    return Err(format!("{}: re-encoding differs", self.id));
                }
            }
            Expectation::Header { version } => {
                let decoded = decode_header(&bytes).map_err(|e| format!("{}: {e}", self.id))?;
                if decoded != *version {
                    return Err(format!("{}: version {decoded}", self.id));
                }
            }
            Expectation::RecordError { .. } => {
                if decode(&bytes).is_ok() {
                    return Err(format!("{}: decoded but should fail", self.id));
                }
            }
            Expectation::HeaderError { .. } => {
                if decode_header(&bytes).is_ok() {
                    return Err(format!("{}: header accepted but should fail", self.id));
                }
            }
        }
        Ok(())
    }
}

/// File header vectors.
pub fn header_vectors() -> Vec<TestVector> {
    vec![
        TestVector {
            id: "header_v1".into(),
            description: "Format version 1".into(),
            hex: "00000001".into(),
            expect: Expectation::Header { version: 1 },
        },
        TestVector {
            id: "header_v2".into(),
            description: "Unknown format version".into(),
            hex: "00000002".into(),
            expect: Expectation::HeaderError {
                reason: "unsupported version".into(),
            },
        },
        TestVector {
            id: "header_short".into(),
            description: "Header shorter than four bytes".into(),
            hex: "000001".into(),
            expect: Expectation::HeaderError {
                reason: "truncated".into(),
            },
        },
    ]
}

/// Record encoding vectors.
pub fn record_encoding_vectors() -> Vec<TestVector> {
    vec![
        TestVector::record(
            "record_no_id",
            "Record without id",
            LogRecord::with_id("users", None, "hello"),
        ),
        TestVector::record(
            "record_with_id",
            "Record with id 42",
            LogRecord::with_id("orders", Some(42), "created"),
        ),
        TestVector::record(
            "record_id_zero",
            "Id 0 is present, not absent",
            LogRecord::with_id("t", Some(0), "p"),
        ),
        TestVector::record(
            "record_id_max",
            "Largest id",
            LogRecord::with_id("t", Some(u32::MAX), "p"),
        ),
        TestVector::record(
            "record_empty",
            "Empty table and payload",
            LogRecord::with_id("", None, ""),
        ),
        TestVector::record(
            "record_multibyte",
            "Lengths count UTF-8 bytes",
            LogRecord::with_id("журнал", Some(1), "лог"),
        ),
    ]
}

/// Malformed record vectors.
pub fn record_error_vectors() -> Vec<TestVector> {
    vec![
        TestVector::record_error("record_truncated_length", "Truncated length prefix", "000000"),
        TestVector::record_error(
            "record_truncated_payload",
            "Payload shorter than its length",
            "000000017400000000056869",
        ),
        TestVector::record_error(
            "record_bad_flag",
            "Presence flag other than 0 or 1",
            "00000001740200000000",
        ),
        TestVector::record_error(
            "record_invalid_utf8",
            "Table is not UTF-8",
            "00000001ff0000000000",
        ),
    ]
}

/// Every vector.
pub fn all_vectors() -> Vec<TestVector> {
    let mut vectors = header_vectors();
    vectors.extend(record_encoding_vectors());
    vectors.extend(record_error_vectors());
    vectors
}

/// Serializes vectors as pretty JSON.
pub fn to_json(vectors: &[TestVector]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(vectors)
}

/// Parses vectors from JSON.
pub fn from_json(json: &str) -> serde_json::Result<Vec<TestVector>> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_verify() {
        for vector in all_vectors() {
            vector.verify().unwrap();
        }
    }

    #[test]
    fn test_vector_ids_unique() {
        let vectors = all_vectors();
        let mut ids: Vec<_> = vectors.iter().map(|v| v.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), vectors.len());
    }

    #[test]
    fn test_known_record_bytes() {
        let v = &record_encoding_vectors()[0];
        assert_eq!(v.hex, "000000057573657273000000000568656c6c6f");
    }

    #[test]
    fn test_json_roundtrip_still_verifies() {
        let json = to_json(&all_vectors()).unwrap();
        assert!(json.contains("\"kind\": \"record_error\""));
        let parsed = from_json(&json).unwrap();
        assert_eq!(parsed.len(), all_vectors().len());
        for vector in parsed {
            vector.verify().unwrap();
        }
    }
}
