//! Error types for the log writer.

use logwriter_codec::CodecError;
use logwriter_store::StoreError;
use std::io;
use thiserror::Error;

/// Result type for log writer operations.
pub type LogResult<T> = Result<T, LogError>;

/// Errors that can occur while appending to the log.
///
/// Lock contention is not an error: both the cross-process mutex and the
/// OS file lock retry until they succeed.
#[derive(Debug, Error)]
pub enum LogError {
    /// The record was rejected before any I/O was attempted.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] CodecError),

    /// Directory creation, rename, open, write, or flush failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The shared store backing the cross-process mutex failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The writer configuration is unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },
}

impl LogError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns true if the caller supplied a bad record.
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}
