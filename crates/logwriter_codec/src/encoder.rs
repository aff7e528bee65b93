//! Record and header encoding.
//!
//! All integers are big-endian unsigned 32-bit.

use crate::error::{CodecError, CodecResult, Field};
use crate::record::LogRecord;
use bytes::{BufMut, BytesMut};

/// Current file format version, written once at the head of every file.
pub const FORMAT_VERSION: u32 = 1;

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 4;

/// Id presence flag: no id follows.
pub(crate) const ID_ABSENT: u8 = 0;

/// Id presence flag: a 4-byte id follows.
pub(crate) const ID_PRESENT: u8 = 1;

/// Returns the 4-byte header that starts every log file.
#[must_use]
pub fn encode_header() -> [u8; HEADER_SIZE] {
    FORMAT_VERSION.to_be_bytes()
}

/// Encodes a record into a fresh buffer.
///
/// # Errors
///
/// Returns [`CodecError::FieldTooLong`] if a string exceeds `u32::MAX` bytes.
pub fn encode(record: &LogRecord) -> CodecResult<Vec<u8>> {
    let mut buf = BytesMut::with_capacity(record.encoded_len());
    encode_into(record, &mut buf)?;
    Ok(buf.to_vec())
}

/// Appends the encoding of `record` to `buf`.
///
/// Nothing is written if the record is rejected.
///
/// # Errors
///
/// Returns [`CodecError::FieldTooLong`] if a string exceeds `u32::MAX` bytes.
pub fn encode_into(record: &LogRecord, buf: &mut BytesMut) -> CodecResult<()> {
    let table_len = prefix_len(Field::Table, &record.table)?;
    let payload_len = prefix_len(Field::Payload, &record.payload)?;

    buf.reserve(record.encoded_len());
    buf.put_u32(table_len);
    buf.put_slice(record.table.as_bytes());
    match record.id {
        None => buf.put_u8(ID_ABSENT),
        Some(id) => {
            buf.put_u8(ID_PRESENT);
            buf.put_u32(id);
        }
    }
    buf.put_u32(payload_len);
    buf.put_slice(record.payload.as_bytes());
    Ok(())
}

fn prefix_len(field: Field, s: &str) -> CodecResult<u32> {
    u32::try_from(s.len()).map_err(|_| CodecError::FieldTooLong {
        field,
        len: s.len(),
    })
}
