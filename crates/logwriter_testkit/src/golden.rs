//! Golden file checks for the on-disk log format.
//!
//! A golden file holds the exact bytes a log file must contain after a
//! known sequence of appends. Set `UPDATE_GOLDEN=1` to rewrite them.

use logwriter_codec::{encode_header, encode_into, CodecResult, LogRecord};
use std::fs;
use std::path::{Path, PathBuf};

/// Compares produced bytes against files in a golden directory.
pub struct GoldenTest {
    name: String,
    golden_dir: PathBuf,
    update_mode: bool,
}

impl GoldenTest {
    /// Creates a golden test named `name` reading from `golden_dir`.
    pub fn new(name: impl Into<String>, golden_dir: impl AsRef<Path>) -> Self {
        Self {
            name: name.into(),
            golden_dir: golden_dir.as_ref().to_path_buf(),
            update_mode: std::env::var("UPDATE_GOLDEN").is_ok(),
        }
    }

    /// Creates a golden test over `docs/test_vectors` at the workspace root.
    pub fn with_default_dir(name: impl Into<String>) -> Self {
        let golden_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .and_then(|p| p.parent())
            .map(|p| p.join("docs").join("test_vectors"))
            .unwrap_or_else(|| PathBuf::from("test_vectors"));

        Self::new(name, golden_dir)
    }

    /// Asserts that `actual` matches `<name>_<suffix>.golden` byte for byte.
    pub fn assert_bytes(&self, suffix: &str, actual: &[u8]) {
        let path = self.file_path(suffix);

        if self.update_mode {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("Failed to create golden directory");
            }
            fs::write(&path, actual).expect("Failed to write golden file");
            println!("Updated golden file: {path:?}");
            return;
        }

        let expected = fs::read(&path).unwrap_or_else(|_| {
            panic!(
                "Golden file not found: {path:?}\n\
                 Run with UPDATE_GOLDEN=1 to create it.\n\
                 Actual bytes (hex): {}",
                hex_encode(actual)
            )
        });

        assert!(
            actual == expected,
            "Golden test '{}' failed for '{suffix}':\n\
             Expected ({} bytes): {}\n\
             Actual ({} bytes): {}\n\
             Run with UPDATE_GOLDEN=1 to update.",
            self.name,
            expected.len(),
            hex_encode(&expected),
            actual.len(),
            hex_encode(actual)
        );
    }

    /// Asserts that a log file holding `records` matches the golden file.
    pub fn assert_log(&self, suffix: &str, records: &[LogRecord]) {
        let image = log_image(records).expect("Golden records must encode");
        self.assert_bytes(suffix, &image);
    }

    fn file_path(&self, suffix: &str) -> PathBuf {
        let filename = if suffix.is_empty() {
            format!("{}.golden", self.name)
        } else {
            format!("{}_{}.golden", self.name, suffix)
        };
        self.golden_dir.join(filename)
    }
}

/// Builds the bytes of a log file: header then each record.
///
/// # Errors
///
/// Fails if any record cannot be encoded.
pub fn log_image(records: &[LogRecord]) -> CodecResult<Vec<u8>> {
    let mut buf = bytes::BytesMut::from(&encode_header()[..]);
    for record in records {
        encode_into(record, &mut buf)?;
    }
    Ok(buf.to_vec())
}

/// Encodes bytes as hexadecimal string.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decodes hexadecimal string to bytes, ignoring whitespace.
pub fn hex_decode(hex: &str) -> Vec<u8> {
    let hex = hex.replace([' ', '\n', '\r'], "");
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).expect("Invalid hex"))
        .collect()
}
