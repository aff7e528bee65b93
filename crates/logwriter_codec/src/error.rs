//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Record field names, used to say which field an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// The table name.
    Table,
    /// The record payload.
    Payload,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => f.write_str("table"),
            Self::Payload => f.write_str("payload"),
        }
    }
}

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The identifier is negative or does not fit in 32 bits.
    #[error("invalid id {0}: must be in 0..=4294967295")]
    InvalidId(i64),

    /// A string field is longer than its 32-bit length prefix allows.
    #[error("{field} too long: {len} bytes")]
    FieldTooLong {
        /// The offending field.
        field: Field,
        /// Its UTF-8 length in bytes.
        len: usize,
    },

    /// The legacy charset has no mapping for a byte of the input.
    #[error("{field} contains bytes not representable in {charset}")]
    Unmappable {
        /// The offending field.
        field: Field,
        /// Name of the source charset.
        charset: &'static str,
    },

    /// Unexpected end of input.
    #[error("unexpected end of input: needed {needed} bytes, {available} available")]
    UnexpectedEof {
        /// Bytes required to continue.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },

    /// The id presence flag was neither 0 nor 1.
    #[error("invalid id presence flag: {0:#04x}")]
    InvalidPresenceFlag(u8),

    /// A stored string is not valid UTF-8.
    #[error("{field} is not valid UTF-8")]
    InvalidUtf8 {
        /// The offending field.
        field: Field,
    },

    /// The file header carries a version this crate cannot read.
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),
}

impl CodecError {
    /// Returns true if this error was raised while validating a record for
    /// encoding, rather than while decoding stored bytes.
    #[must_use]
    pub fn is_encode_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidId(_) | Self::FieldTooLong { .. } | Self::Unmappable { .. }
        )
    }
}
