//! The log record type.

use crate::charset::LegacyCharset;
use crate::error::{CodecError, CodecResult, Field};

/// One emitted event: a table name, an optional numeric id, and a payload.
///
/// Strings are held as UTF-8. Use [`LogRecord::from_legacy`] for input that
/// is still in the legacy charset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogRecord {
    /// Short identifying string (normalized table name).
    pub table: String,
    /// Optional non-negative identifier.
    pub id: Option<u32>,
    /// Arbitrary payload text.
    pub payload: String,
}

impl LogRecord {
    /// Creates a record, validating that `id` fits in an unsigned 32-bit
    /// integer.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidId`] if `id` is negative or larger than
    /// `u32::MAX`.
    pub fn new(
        table: impl Into<String>,
        id: Option<i64>,
        payload: impl Into<String>,
    ) -> CodecResult<Self> {
        Ok(Self {
            table: table.into(),
            id: validate_id(id)?,
            payload: payload.into(),
        })
    }

    /// Creates a record from an already range-checked id.
    #[must_use]
    pub fn with_id(table: impl Into<String>, id: Option<u32>, payload: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            id,
            payload: payload.into(),
        }
    }

    /// Creates a record from strings encoded in a legacy charset.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidId`] for an out-of-range id and
    /// [`CodecError::Unmappable`] if either string contains bytes the
    /// charset cannot map.
    pub fn from_legacy(
        table: &[u8],
        id: Option<i64>,
        payload: &[u8],
        charset: LegacyCharset,
    ) -> CodecResult<Self> {
        let id = validate_id(id)?;
        Ok(Self {
            table: charset.decode(Field::Table, table)?,
            id,
            payload: charset.decode(Field::Payload, payload)?,
        })
    }

    /// Number of bytes [`crate::encode`] produces for this record.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let id_len = if self.id.is_some() { 5 } else { 1 };
        4 + self.table.len() + id_len + 4 + self.payload.len()
    }
}

fn validate_id(id: Option<i64>) -> CodecResult<Option<u32>> {
    id.map(|v| u32::try_from(v).map_err(|_| CodecError::InvalidId(v)))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_accepts_u32_range() {
        let record = LogRecord::new("t", Some(0), "p").unwrap();
        assert_eq!(record.id, Some(0));

        let record = LogRecord::new("t", Some(i64::from(u32::MAX)), "p").unwrap();
        assert_eq!(record.id, Some(u32::MAX));

        let record = LogRecord::new("t", None, "p").unwrap();
        assert_eq!(record.id, None);
    }

    #[test]
    fn new_rejects_negative_id() {
        assert_eq!(
            LogRecord::new("t", Some(-1), "p"),
            Err(CodecError::InvalidId(-1))
        );
    }

    #[test]
    fn new_rejects_oversized_id() {
        let too_big = i64::from(u32::MAX) + 1;
        assert_eq!(
            LogRecord::new("t", Some(too_big), "p"),
            Err(CodecError::InvalidId(too_big))
        );
    }

    #[test]
    fn from_legacy_transcodes_both_fields() {
        let charset = LegacyCharset::WINDOWS_1251;
        let table = charset.encode("заказы").unwrap();
        let payload = charset.encode("строка").unwrap();

        let record = LogRecord::from_legacy(&table, Some(7), &payload, charset).unwrap();
        assert_eq!(record.table, "заказы");
        assert_eq!(record.payload, "строка");
        assert_eq!(record.id, Some(7));
    }

    #[test]
    fn from_legacy_checks_id_first() {
        let result = LogRecord::from_legacy(b"t", Some(-5), b"p", LegacyCharset::default());
        assert_eq!(result, Err(CodecError::InvalidId(-5)));
    }

    #[test]
    fn encoded_len_counts_utf8_bytes() {
        let record = LogRecord::with_id("users", None, "hello");
        assert_eq!(record.encoded_len(), 4 + 5 + 1 + 4 + 5);

        let record = LogRecord::with_id("ж", Some(1), "");
        assert_eq!(record.encoded_len(), 4 + 2 + 5 + 4);
    }
}
