//! Typed record writer.

use crate::config::StreamConfig;
use crate::error::CoreResult;
use crate::position::{Checkpointable, Position, PositioningMode};
use crate::stream::reader::check_codec;
use crate::stream::FramedRecordStream;
use rdwbatch_codec::RecordCodec;
use rdwbatch_storage::StorageBackend;
use std::fmt;

/// Encodes values with a codec and appends them to a stream.
pub struct RecordWriter<C> {
    stream: FramedRecordStream,
    codec: C,
}

impl<C: RecordCodec> RecordWriter<C> {
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

    /// Opens a writer over `backend`, positioned after existing records.
    ///
    /// # Errors
    ///
    /// Same as [`FramedRecordStream::open_writer`] and [`new`](Self::new).
    pub fn open(backend: Box<dyn StorageBackend>, config: &StreamConfig, codec: C) -> CoreResult<Self> {
        Self::new(FramedRecordStream::open_writer(backend, config)?, codec)
    }

    /// Opens a writer over `backend` at a checkpointed position.
    ///
    /// # Errors
    ///
    /// Same as [`FramedRecordStream::resume_writer`] and [`new`](Self::new).
    pub fn resume(
        backend: Box<dyn StorageBackend>,
        config: &StreamConfig,
        codec: C,
        position: Position,
    ) -> CoreResult<Self> {
        Self::new(FramedRecordStream::resume_writer(backend, config, position)?, codec)
    }

    /// Encodes and appends one value, returning its record index.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the value does not encode, or the stream's
    /// write error. Nothing is written on failure.
    pub fn write(&mut self, value: &C::Value) -> CoreResult<u64> {
        let bytes = self.codec.encode(value)?;
        self.stream.write(&bytes)
    }

    /// Appends every value in order and returns how many were written.
    ///
    /// Stops at the first failure; earlier values stay written.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn write_all<'a, I>(&mut self, values: I) -> CoreResult<u64>
    where
        I: IntoIterator<Item = &'a C::Value>,
        C::Value: 'a,
    {
        let mut written = 0;
        for value in values {
            self.write(value)?;
            written += 1;
        }
        Ok(written)
    }

    /// Flushes appended records to the OS.
    ///
    /// # Errors
    ///
    /// Returns the backend's flush error.
    pub fn flush(&mut self) -> CoreResult<()> {
        self.stream.flush()
    }

    /// The underlying stream.
    pub fn stream(&self) -> &FramedRecordStream {
        &self.stream
    }

    /// Releases the stream.
    pub fn into_stream(self) -> FramedRecordStream {
        self.stream
    }
}

impl<C> fmt::Debug for RecordWriter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordWriter")
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

impl<C> Checkpointable for RecordWriter<C> {
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
