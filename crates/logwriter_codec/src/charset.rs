//! Legacy single-byte charset transcoding.
//!
//! Table names and payloads may arrive in a legacy single-byte encoding
//! (windows-1251 by default). They are transcoded to UTF-8 before being
//! length-prefixed, so the stored length is always the UTF-8 byte length.

use crate::error::{CodecError, CodecResult, Field};
use encoding_rs::Encoding;

/// A source charset that record strings are transcoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyCharset(&'static Encoding);

impl LegacyCharset {
    /// windows-1251, the charset the log producers historically emit.
    pub const WINDOWS_1251: Self = Self(encoding_rs::WINDOWS_1251);

    /// Wraps an arbitrary `encoding_rs` encoding.
    #[must_use]
    pub const fn new(encoding: &'static Encoding) -> Self {
        Self(encoding)
    }

    /// Looks a charset up by its WHATWG label (e.g. `"cp1251"`, `"koi8-r"`).
    #[must_use]
    pub fn for_label(label: &str) -> Option<Self> {
        Encoding::for_label(label.as_bytes()).map(Self)
    }

    /// Returns the canonical name of the charset.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Decodes `bytes` to a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Unmappable`] if a byte has no mapping in this
    /// charset. Nothing is replaced silently.
    pub fn decode(&self, field: Field, bytes: &[u8]) -> CodecResult<String> {
        self.0
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|s| s.into_owned())
            .ok_or(CodecError::Unmappable {
                field,
                charset: self.name(),
            })
    }

    /// Encodes a UTF-8 string back into this charset.
    ///
    /// Returns `None` if a character has no representation.
    #[must_use]
    pub fn encode(&self, s: &str) -> Option<Vec<u8>> {
        let (bytes, _, had_errors) = self.0.encode(s);
        if had_errors {
            None
        } else {
            Some(bytes.into_owned())
        }
    }
}

impl Default for LegacyCharset {
    fn default() -> Self {
        Self::WINDOWS_1251
    }
}
