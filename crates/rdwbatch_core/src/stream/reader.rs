//! Typed record reader.

use crate::config::StreamConfig;
use crate::error::{CoreError, CoreResult};
use crate::position::{Checkpointable, Position, PositioningMode};
use crate::stream::FramedRecordStream;
use rdwbatch_codec::RecordCodec;
use rdwbatch_storage::StorageBackend;
use std::fmt;

/// A decoded record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    /// 0-based record index.
    pub index: u64,
    /// Raw payload bytes.
    pub bytes: Vec<u8>,
    /// Value decoded from `bytes`.
    pub value: T,
}

/// Reads records from a stream and decodes them with a codec.
///
/// A record that fails to decode is still consumed: the error carries the
/// raw bytes and the next call moves on to the following record.
pub struct RecordReader<C> {
    stream: FramedRecordStream,
    codec: C,
}

impl<C: RecordCodec> RecordReader<C> {
    /// Wraps an open stream.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the codec and stream disagree on the
    /// record length.
    pub fn new(stream: FramedRecordStream, codec: C) -> CoreResult<Self> {
        check_codec(&stream, &codec)?;
        Ok(Self { stream, codec })
    }

    /// Opens a reader over `backend`.
    ///
    /// # Errors
    ///
    /// Same as [`FramedRecordStream::open`] and [`new`](Self::new).
    pub fn open(backend: Box<dyn StorageBackend>, config: &StreamConfig, codec: C) -> CoreResult<Self> {
        Self::new(FramedRecordStream::open(backend, config)?, codec)
    }

    /// Reads and decodes the next record.
    ///
    /// # Errors
    ///
    /// Returns stream errors unchanged, and [`CoreError::Decode`] when the
    /// payload does not decode.
    pub fn read_next(&mut self) -> CoreResult<Option<Record<C::Value>>> {
        let Some(raw) = self.stream.read_next()? else {
            return Ok(None);
        };

        match self.codec.decode(&raw.bytes) {
            Ok(value) => Ok(Some(Record {
                index: raw.index,
                bytes: raw.bytes,
                value,
            })),
            Err(source) => Err(CoreError::Decode {
                index: raw.index,
                bytes: raw.bytes,
                source,
            }),
        }
    }

    /// The codec in use.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// The underlying stream.
    pub fn stream(&self) -> &FramedRecordStream {
        &self.stream
    }

    /// Mutable access to the underlying stream.
    pub fn stream_mut(&mut self) -> &mut FramedRecordStream {
        &mut self.stream
    }

    /// Releases the stream.
    pub fn into_stream(self) -> FramedRecordStream {
        self.stream
    }
}

pub(crate) fn check_codec<C: RecordCodec>(stream: &FramedRecordStream, codec: &C) -> CoreResult<()> {
    if codec.record_length() != stream.record_length() {
        return Err(CoreError::configuration(
            crate::config::options::RECORD_LENGTH,
            format!(
                "codec expects {} bytes but the stream holds {}-byte records",
                codec.record_length(),
                stream.record_length()
            ),
        ));
    }
    Ok(())
}

impl<C: RecordCodec> Iterator for RecordReader<C> {
    type Item = CoreResult<Record<C::Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}

impl<C> fmt::Debug for RecordReader<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordReader")
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

impl<C> Checkpointable for RecordReader<C> {
    fn positioning_mode(&self) -> PositioningMode {
        self.stream.positioning_mode()
    }

    fn current_position(&mut self) -> CoreResult<Position> {
        self.stream.current_position()
    }

    fn restore(&mut self, position: Position) -> CoreResult<()> {
        self.stream.restore(position)
    }
}
