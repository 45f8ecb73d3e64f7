//! CBOR codec for serde types.

use crate::error::{CodecError, CodecResult};
use crate::RecordCodec;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

/// Stores a serde value as one CBOR item, zero-padded to the record length.
///
/// CBOR items are self-delimiting, so the padding after the item is never
/// read back. A value whose encoding is longer than the record length is
/// rejected with [`CodecError::ValueTooWide`].
///
/// # Example
///
/// ```
/// use rdwbatch_codec::{CborCodec, RecordCodec};
///
/// let codec = CborCodec::<(u32, String)>::new(32);
/// let bytes = codec.encode(&(7, "seven".to_string())).unwrap();
/// assert_eq!(bytes.len(), 32);
/// assert_eq!(codec.decode(&bytes).unwrap(), (7, "seven".to_string()));
/// ```
pub struct CborCodec<T> {
    record_length: usize,
    _value: PhantomData<fn() -> T>,
}

impl<T> CborCodec<T> {
    /// Creates a codec producing records of `record_length` bytes.
    #[must_use]
    pub const fn new(record_length: usize) -> Self {
        Self {
            record_length,
            _value: PhantomData,
        }
    }
}

impl<T> Clone for CborCodec<T> {
    fn clone(&self) -> Self {
        Self::new(self.record_length)
    }
}

impl<T> fmt::Debug for CborCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CborCodec")
            .field("record_length", &self.record_length)
            .field("value", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Serialize + DeserializeOwned> RecordCodec for CborCodec<T> {
    type Value = T;

    fn record_length(&self) -> usize {
        self.record_length
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<T> {
        CodecError::check_length(self.record_length, bytes.len())?;
        ciborium::de::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
    }

    fn encode(&self, value: &T) -> CodecResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.record_length);
        ciborium::ser::into_writer(value, &mut buf)
            .map_err(|e| CodecError::encoding_failed(e.to_string()))?;

        if buf.len() > self.record_length {
            return Err(CodecError::ValueTooWide {
                width: self.record_length,
                actual: buf.len(),
            });
        }

        buf.resize(self.record_length, 0);
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Account {
        id: u32,
        owner: String,
        balance_cents: i64,
    }

    #[test]
    fn pads_to_record_length() {
        let codec = CborCodec::<Account>::new(64);
        let account = Account {
            id: 1,
            owner: "a".into(),
            balance_cents: -250,
        };

        let bytes = codec.encode(&account).unwrap();
        assert_eq!(bytes.len(), 64);
        assert_eq!(*bytes.last().unwrap(), 0);
        assert_eq!(codec.decode(&bytes).unwrap(), account);
    }

    #[test]
    fn rejects_value_wider_than_record() {
        let codec = CborCodec::<String>::new(4);
        let result = codec.encode(&"far too long".to_string());
        assert!(matches!(result, Err(CodecError::ValueTooWide { width: 4, .. })));
    }

    #[test]
    fn rejects_garbage() {
        let codec = CborCodec::<Account>::new(8);
        assert!(matches!(
            codec.decode(&[0xff; 8]),
            Err(CodecError::DecodingFailed { .. })
        ));
    }

    proptest! {
        #[test]
        fn roundtrip(id in any::<u32>(), owner in "[a-z]{0,16}", balance in any::<i64>()) {
            let codec = CborCodec::<Account>::new(64);
            let account = Account { id, owner, balance_cents: balance };
            let bytes = codec.encode(&account).unwrap();
            prop_assert_eq!(codec.decode(&bytes).unwrap(), account);
        }
    }
}
