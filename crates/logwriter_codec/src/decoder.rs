//! Record and header decoding.

use crate::encoder::{FORMAT_VERSION, ID_ABSENT, ID_PRESENT};
use crate::error::{CodecError, CodecResult, Field};
use crate::record::LogRecord;
use bytes::Buf;

/// Decodes one record from the front of `bytes`.
///
/// Returns the record and the number of bytes it occupied.
///
/// # Errors
///
/// Returns an error if the bytes are truncated, the presence flag is not
/// 0 or 1, or a string is not valid UTF-8.
pub fn decode(bytes: &[u8]) -> CodecResult<(LogRecord, usize)> {
    let mut decoder = RecordDecoder::new(bytes);
    let record = decoder.decode_record()?;
    Ok((record, decoder.position()))
}

/// Validates a file header and returns its format version.
///
/// # Errors
///
/// Returns [`CodecError::UnexpectedEof`] for fewer than four bytes and
/// [`CodecError::UnsupportedVersion`] for any version other than
/// [`FORMAT_VERSION`].
pub fn decode_header(bytes: &[u8]) -> CodecResult<u32> {
    let mut decoder = RecordDecoder::new(bytes);
    decoder.decode_header()
}

/// Decodes a whole file image: header followed by back-to-back records.
///
/// # Errors
///
/// Fails on a bad header or on the first malformed record, including a
/// record truncated at the end of the buffer.
pub fn decode_stream(bytes: &[u8]) -> CodecResult<Vec<LogRecord>> {
    let mut decoder = RecordDecoder::new(bytes);
    decoder.decode_header()?;
    decoder.collect()
}

/// A cursor over encoded records.
///
/// Iterating yields records until the buffer is exhausted; a partial record
/// at the end is reported as an error rather than silently dropped.
pub struct RecordDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> RecordDecoder<'a> {
    /// Creates a decoder positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns true when no bytes remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Reads and validates the 4-byte file header.
    pub fn decode_header(&mut self) -> CodecResult<u32> {
        let version = self.read_u32()?;
        if version != FORMAT_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        Ok(version)
    }

    /// Reads the next record.
    pub fn decode_record(&mut self) -> CodecResult<LogRecord> {
        let table = self.read_string(Field::Table)?;
        let id = match self.read_u8()? {
            ID_ABSENT => None,
            ID_PRESENT => Some(self.read_u32()?),
            other => return Err(CodecError::InvalidPresenceFlag(other)),
        };
        let payload = self.read_string(Field::Payload)?;
        Ok(LogRecord { table, id, payload })
    }

    fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    fn ensure(&self, needed: usize) -> CodecResult<()> {
        let available = self.remaining().len();
        if available < needed {
            return Err(CodecError::UnexpectedEof { needed, available });
        }
        Ok(())
    }

    fn read_u8(&mut self) -> CodecResult<u8> {
        self.ensure(1)?;
        let mut buf = self.remaining();
        let value = buf.get_u8();
        self.pos += 1;
        Ok(value)
    }

    fn read_u32(&mut self) -> CodecResult<u32> {
        self.ensure(4)?;
        let mut buf = self.remaining();
        let value = buf.get_u32();
        self.pos += 4;
        Ok(value)
    }

    fn read_string(&mut self, field: Field) -> CodecResult<String> {
        let len = self.read_u32()? as usize;
        self.ensure(len)?;
        let bytes = &self.remaining()[..len];
        let s = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8 { field })?;
        self.pos += len;
        Ok(s.to_owned())
    }
}

impl Iterator for RecordDecoder<'_> {
    type Item = CodecResult<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_empty() {
            return None;
        }
        let result = self.decode_record();
        if result.is_err() {
            // Stop after the first error; the cursor is no longer aligned.
            self.pos = self.data.len();
        }
        Some(result)
    }
}
