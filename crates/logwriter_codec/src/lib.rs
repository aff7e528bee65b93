//! # Log Writer Codec
//!
//! Binary record encoding for the rotating log writer.
//!
//! Every log file starts with a 4-byte big-endian format version, followed
//! by records laid out back-to-back with no padding:
//!
//! ```text
//! | table_len u32 | table utf-8 | flag u8 | [id u32] | payload_len u32 | payload utf-8 |
//! ```
//!
//! `flag` is `0` when the record has no id and `1` when a 4-byte id
//! follows. Lengths are UTF-8 byte lengths; there are no terminators.
//!
//! ## Usage
//!
//! ```
//! use logwriter_codec::{decode, encode, LogRecord};
//!
//! let record = LogRecord::new("orders", Some(42), "created").unwrap();
//! let bytes = encode(&record).unwrap();
//!
//! let (decoded, consumed) = decode(&bytes).unwrap();
//! assert_eq!(decoded, record);
//! assert_eq!(consumed, bytes.len());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod charset;
mod decoder;
mod encoder;
mod error;
mod record;

pub use charset::LegacyCharset;
pub use decoder::{decode, decode_header, decode_stream, RecordDecoder};
pub use encoder::{encode, encode_header, encode_into, FORMAT_VERSION, HEADER_SIZE};
pub use error::{CodecError, CodecResult, Field};
pub use record::LogRecord;
