//! # rdwbatch Codec
//!
//! Conversion between fixed-length record buffers and application values.
//!
//! A record stream only ever moves opaque buffers of exactly
//! `record_length` bytes. A [`RecordCodec`] gives those buffers meaning:
//!
//! - [`RawCodec`] passes the bytes through unchanged
//! - [`CborCodec`] stores any serde type as CBOR, zero-padded to the
//!   record length
//! - [`FieldWriter`] / [`FieldReader`] help hand-written codecs lay out
//!   big-endian binary, fixed-width text, and packed-decimal fields
//!
//! ## Usage
//!
//! ```
//! use rdwbatch_codec::{RawCodec, RecordCodec};
//!
//! let codec = RawCodec::new(4);
//! let bytes = codec.encode(&b"abcd".to_vec()).unwrap();
//! assert_eq!(codec.decode(&bytes).unwrap(), b"abcd");
//! assert!(codec.encode(&b"abc".to_vec()).is_err());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod error;
mod layout;
mod raw;

pub use cbor::CborCodec;
pub use error::{CodecError, CodecResult};
pub use layout::{FieldReader, FieldWriter};
pub use raw::RawCodec;

/// Converts fixed-length record buffers to and from values.
///
/// # Contract
///
/// - `encode` returns exactly [`record_length`](Self::record_length) bytes
/// - `decode` accepts exactly `record_length` bytes
/// - `decode(encode(v)) == v` for every value the codec accepts
pub trait RecordCodec {
    /// The decoded record type.
    type Value;

    /// Fixed length in bytes of every record handled by this codec.
    fn record_length(&self) -> usize;

    /// Decodes one record buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer has the wrong length or does not
    /// hold a valid record.
    fn decode(&self, bytes: &[u8]) -> CodecResult<Self::Value>;

    /// Encodes one value into a record buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented in
    /// `record_length` bytes.
    fn encode(&self, value: &Self::Value) -> CodecResult<Vec<u8>>;
}

impl<C: RecordCodec + ?Sized> RecordCodec for &C {
    type Value = C::Value;

    fn record_length(&self) -> usize {
        (**self).record_length()
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<Self::Value> {
        (**self).decode(bytes)
    }

    fn encode(&self, value: &Self::Value) -> CodecResult<Vec<u8>> {
        (**self).encode(value)
    }
}

impl<C: RecordCodec + ?Sized> RecordCodec for Box<C> {
    type Value = C::Value;

    fn record_length(&self) -> usize {
        (**self).record_length()
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<Self::Value> {
        (**self).decode(bytes)
    }

    fn encode(&self, value: &Self::Value) -> CodecResult<Vec<u8>> {
        (**self).encode(value)
    }
}
