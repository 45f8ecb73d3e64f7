//! Framed record stream.

use crate::config::StreamConfig;
use crate::error::{CoreError, CoreResult};
use crate::position::{Checkpointable, Position, PositioningMode};
use crate::stream::frame::{self, HEADER_SIZE};
use rdwbatch_codec::CodecError;
use rdwbatch_storage::StorageBackend;
use std::fmt;

/// Which side of a step a stream serves.
///
/// Decides what restoring a position means: readers reposition, writers
/// cut away output written after the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRole {
    /// Input stream; restore seeks.
    Reader,
    /// Output stream; restore truncates.
    Writer,
}

/// One record as it was read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// 0-based record index.
    pub index: u64,
    /// Byte offset of the frame header.
    pub offset: u64,
    /// Payload bytes, exactly `record_length` long.
    pub bytes: Vec<u8>,
}

/// Sequential access to RDW-framed fixed-length records.
///
/// The stream tracks two cursors: the byte offset of the next frame and the
/// index of the next record. Both advance together on every successful read
/// or write and are never touched by a failed one.
///
/// # Example
///
/// ```rust
/// use rdwbatch_core::{FramedRecordStream, StreamConfig};
/// use rdwbatch_storage::InMemoryBackend;
///
/// let config = StreamConfig::new(3);
/// let mut out = FramedRecordStream::open_writer(Box::new(InMemoryBackend::new()), &config).unwrap();
/// out.write(b"abc").unwrap();
/// out.write(b"def").unwrap();
///
/// let mut input = FramedRecordStream::open(out.into_backend(), &config).unwrap();
/// assert_eq!(input.read_next().unwrap().unwrap().bytes, b"abc");
/// assert_eq!(input.read_next().unwrap().unwrap().bytes, b"def");
/// assert!(input.read_next().unwrap().is_none());
/// ```
pub struct FramedRecordStream {
    backend: Box<dyn StorageBackend>,
    record_length: usize,
    frame_size: usize,
    mode: PositioningMode,
    role: StreamRole,
    /// Byte offset of the next frame.
    offset: u64,
    /// Index of the next record.
    records: u64,
}

impl FramedRecordStream {
    /// Opens a stream for reading, positioned at record 0.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the record length is out of range.
    pub fn open(backend: Box<dyn StorageBackend>, config: &StreamConfig) -> CoreResult<Self> {
        Self::bind(backend, config, StreamRole::Reader)
    }

    /// Opens a stream for writing, positioned after the existing records.
    ///
    /// Existing output is walked frame by frame so a damaged tail is
    /// reported before anything is appended to it.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the record length is out of range,
    /// or a framing error if existing output is not a whole number of
    /// valid frames.
    pub fn open_writer(backend: Box<dyn StorageBackend>, config: &StreamConfig) -> CoreResult<Self> {
        let mut stream = Self::bind(backend, config, StreamRole::Writer)?;
        stream.seek_to_end()?;
        Ok(stream)
    }

    /// Opens a stream for writing at a checkpointed position.
    ///
    /// Only the frames before `position` are checked, and everything after
    /// it is cut away, so output left torn by a crash can be resumed.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the record length is out of range,
    /// or the error [`truncate_at_record`](Self::truncate_at_record) reports
    /// for `position`.
    pub fn resume_writer(
        backend: Box<dyn StorageBackend>,
        config: &StreamConfig,
        position: Position,
    ) -> CoreResult<Self> {
        let mut stream = Self::bind(backend, config, StreamRole::Writer)?;
        stream.restore(position)?;
        Ok(stream)
    }

    fn bind(
        backend: Box<dyn StorageBackend>,
        config: &StreamConfig,
        role: StreamRole,
    ) -> CoreResult<Self> {
        config.validate()?;
        let mode = PositioningMode::resolve(config.large_dataset_support, backend.is_seekable());

        tracing::debug!(
            record_length = config.record_length,
            mode = %mode,
            role = ?role,
            "opened record stream"
        );

        Ok(Self {
            backend,
            record_length: config.record_length,
            frame_size: frame::frame_size(config.record_length),
            mode,
            role,
            offset: 0,
            records: 0,
        })
    }

    /// Payload length of every record.
    #[must_use]
    pub fn record_length(&self) -> usize {
        self.record_length
    }

    /// Size of one frame: header plus payload.
    #[must_use]
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Positioning mode fixed at open.
    #[must_use]
    pub fn mode(&self) -> PositioningMode {
        self.mode
    }

    /// Whether this stream reads or writes.
    #[must_use]
    pub fn role(&self) -> StreamRole {
        self.role
    }

    /// Index of the next record: records consumed or produced so far.
    #[must_use]
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Byte offset of the next frame.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns true if the backend supports seeking.
    #[must_use]
    pub fn is_seekable(&self) -> bool {
        self.backend.is_seekable()
    }

    /// Reads the next record.
    ///
    /// Returns `Ok(None)` at a clean end of stream, that is when no bytes
    /// remain at a frame boundary.
    ///
    /// # Errors
    ///
    /// Returns a framing error if the header is truncated, the length field
    /// does not match the frame size, or the payload is incomplete.
    pub fn read_next(&mut self) -> CoreResult<Option<RawRecord>> {
        let offset = self.offset;
        let index = self.records;
        let mut frame = self.backend.read_available(offset, self.frame_size)?;

        if frame.is_empty() {
            return Ok(None);
        }
        if frame.len() < HEADER_SIZE {
            return Err(CoreError::framing(
                offset,
                index,
                format!("truncated header: {} of {HEADER_SIZE} bytes", frame.len()),
            ));
        }

        frame::check_header([frame[0], frame[1]], self.frame_size, offset, index)?;

        if frame.len() < self.frame_size {
            return Err(CoreError::framing(
                offset,
                index,
                format!(
                    "truncated payload: {} of {} bytes",
                    frame.len() - HEADER_SIZE,
                    self.record_length
                ),
            ));
        }

        let bytes = frame.split_off(HEADER_SIZE);
        self.offset += self.frame_size as u64;
        self.records += 1;
        Ok(Some(RawRecord {
            index,
            offset,
            bytes,
        }))
    }

    /// Appends one record.
    ///
    /// Returns the index the record was written at. The stream must be
    /// positioned at the end of storage.
    ///
    /// On failure a seekable backend is truncated back to its size before
    /// the write, and the stream position is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns a codec error if `payload` is not `record_length` bytes, an
    /// invalid operation error if the stream is not at the end of storage,
    /// or the storage error that failed the append.
    pub fn write(&mut self, payload: &[u8]) -> CoreResult<u64> {
        CodecError::check_length(self.record_length, payload.len())?;

        let size = self.backend.size()?;
        if size != self.offset {
            return Err(CoreError::invalid_operation(format!(
                "write at offset {} but storage ends at {size}; truncate_at_record first",
                self.offset
            )));
        }

        let data = frame::encode_frame(payload)?;
        if let Err(err) = self.backend.append(&data) {
            self.rollback(size);
            return Err(err.into());
        }

        let index = self.records;
        self.offset += self.frame_size as u64;
        self.records += 1;
        Ok(index)
    }

    fn rollback(&mut self, size: u64) {
        if !self.backend.is_seekable() {
            return;
        }
        match self.backend.size() {
            Ok(current) if current > size => {
                if let Err(err) = self.backend.truncate(size) {
                    tracing::warn!(offset = size, error = %err, "failed to roll back partial frame");
                }
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(offset = size, error = %err, "failed to roll back partial frame");
            }
        }
    }

    /// Repositions to the start of record `n`.
    ///
    /// In byte-offset mode this is a direct seek. In replay mode records are
    /// consumed one at a time from the current record, or from the start of
    /// the stream when `n` lies behind it.
    ///
    /// # Errors
    ///
    /// Returns `PositionOutOfRange` if the stream holds fewer than `n`
    /// records, `SeekUnsupported` when rewinding a forward-only backend, or
    /// any framing error met while replaying.
    pub fn seek_to_record(&mut self, n: u64) -> CoreResult<()> {
        match self.mode {
            PositioningMode::ByteOffset => {
                let size = self.backend.size()?;
                let target = n
                    .checked_mul(self.frame_size as u64)
                    .filter(|target| *target <= size)
                    .ok_or(CoreError::PositionOutOfRange {
                        requested: n,
                        available: size / self.frame_size as u64,
                    })?;
                self.offset = target;
                self.records = n;
            }
            PositioningMode::Replay => {
                if n < self.records {
                    if !self.backend.is_seekable() {
                        return Err(CoreError::seek_unsupported(format!(
                            "cannot rewind from record {} to {n} on forward-only storage",
                            self.records
                        )));
                    }
                    self.offset = 0;
                    self.records = 0;
                }
                while self.records < n {
                    if self.read_next()?.is_none() {
                        return Err(CoreError::PositionOutOfRange {
                            requested: n,
                            available: self.records,
                        });
                    }
                }
            }
        }

        tracing::debug!(record = n, offset = self.offset, mode = %self.mode, "seeked record stream");
        Ok(())
    }

    /// Positions after the last record.
    ///
    /// # Errors
    ///
    /// Returns a framing error if storage does not end on a frame boundary.
    pub fn seek_to_end(&mut self) -> CoreResult<()> {
        if !self.backend.is_seekable() {
            let size = self.backend.size()?;
            if size != self.offset {
                return Err(CoreError::seek_unsupported(
                    "cannot skip unread input on forward-only storage",
                ));
            }
            return Ok(());
        }

        let (records, offset) = self.walk_frames(u64::MAX)?;
        self.records = records;
        self.offset = offset;
        Ok(())
    }

    /// Cuts storage after record `n` and positions there.
    ///
    /// Existing frames are walked from the start of storage, each header
    /// checked, and storage is truncated at the offset of record `n`.
    ///
    /// # Errors
    ///
    /// Returns `PositionOutOfRange` when fewer than `n` records exist, a
    /// framing error for a damaged frame before record `n`, or
    /// `SeekUnsupported` on forward-only storage unless nothing would be cut.
    pub fn truncate_at_record(&mut self, n: u64) -> CoreResult<()> {
        if !self.backend.is_seekable() {
            let size = self.backend.size()?;
            if n == self.records && size == self.offset {
                return Ok(());
            }
            return Err(CoreError::seek_unsupported(format!(
                "cannot truncate forward-only storage at record {n}"
            )));
        }

        let (records, offset) = self.walk_frames(n)?;
        if records < n {
            return Err(CoreError::PositionOutOfRange {
                requested: n,
                available: records,
            });
        }

        self.backend.truncate(offset)?;
        self.offset = offset;
        self.records = n;

        tracing::debug!(record = n, offset, "truncated record stream");
        Ok(())
    }

    /// Walks frame headers from the start of storage.
    ///
    /// Stops after `limit` frames or at end of storage. Returns the number
    /// of frames walked and the offset after the last one.
    fn walk_frames(&self, limit: u64) -> CoreResult<(u64, u64)> {
        let size = self.backend.size()?;
        let mut offset = 0u64;
        let mut records = 0u64;

        while records < limit && offset < size {
            let remaining = size - offset;
            if remaining < HEADER_SIZE as u64 {
                return Err(CoreError::framing(offset, records, "truncated header"));
            }

            let header = self.backend.read_at(offset, HEADER_SIZE)?;
            frame::check_header([header[0], header[1]], self.frame_size, offset, records)?;

            if remaining < self.frame_size as u64 {
                return Err(CoreError::framing(
                    offset,
                    records,
                    format!(
                        "truncated payload: {} of {} bytes",
                        remaining - HEADER_SIZE as u64,
                        self.record_length
                    ),
                ));
            }

            offset += self.frame_size as u64;
            records += 1;
        }

        Ok((records, offset))
    }

    /// Flushes appended frames to the OS.
    ///
    /// # Errors
    ///
    /// Returns the backend's flush error.
    pub fn flush(&mut self) -> CoreResult<()> {
        self.backend.flush()?;
        Ok(())
    }

    /// Flushes and syncs appended frames to durable storage.
    ///
    /// # Errors
    ///
    /// Returns the backend's sync error.
    pub fn sync(&mut self) -> CoreResult<()> {
        self.backend.sync()?;
        Ok(())
    }

    /// Releases the backend.
    #[must_use]
    pub fn into_backend(self) -> Box<dyn StorageBackend> {
        self.backend
    }

    /// Converts a position of this stream into a record index.
    fn record_index(&self, position: Position) -> CoreResult<u64> {
        if position.mode() != self.mode {
            return Err(CoreError::invalid_position(format!(
                "{} position given to a {} stream",
                position.mode(),
                self.mode
            )));
        }
        match position {
            Position::RecordCount(n) => Ok(n),
            Position::ByteOffset(offset) => {
                let frame = self.frame_size as u64;
                if offset % frame != 0 {
                    return Err(CoreError::invalid_position(format!(
                        "byte offset {offset} is not on a {frame}-byte frame boundary"
                    )));
                }
                Ok(offset / frame)
            }
        }
    }
}

impl Checkpointable for FramedRecordStream {
    fn positioning_mode(&self) -> PositioningMode {
        self.mode
    }

    fn current_position(&mut self) -> CoreResult<Position> {
        self.backend.flush()?;
        Ok(match self.mode {
            PositioningMode::ByteOffset => Position::ByteOffset(self.offset),
            PositioningMode::Replay => Position::RecordCount(self.records),
        })
    }

    fn restore(&mut self, position: Position) -> CoreResult<()> {
        let n = self.record_index(position)?;
        match self.role {
            StreamRole::Reader => self.seek_to_record(n),
            StreamRole::Writer => self.truncate_at_record(n),
        }
    }
}

impl fmt::Debug for FramedRecordStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramedRecordStream")
            .field("record_length", &self.record_length)
            .field("mode", &self.mode)
            .field("role", &self.role)
            .field("offset", &self.offset)
            .field("records", &self.records)
            .finish_non_exhaustive()
    }
}
