//! Test fixtures and dataset helpers.
//!
//! Provides a fixed-layout test record, a codec for it, and temporary
//! file-backed datasets.

use rdwbatch_codec::{CodecError, CodecResult, FieldReader, FieldWriter, RecordCodec};
use rdwbatch_core::stream::frame::encode_frame;
use rdwbatch_core::{RecordReader, RecordWriter, StreamConfig};
use rdwbatch_storage::{FileBackend, InMemoryBackend, StorageBackend};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Payload length of a [`TestRecord`].
pub const TEST_RECORD_LENGTH: usize = 52;

/// Width of the [`TestRecord::text`] field.
pub const TEXT_WIDTH: usize = 48;

/// A record with a big-endian id and a space-padded text field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRecord {
    /// Record id.
    pub id: i32,
    /// Text, at most [`TEXT_WIDTH`] bytes.
    pub text: String,
}

impl TestRecord {
    /// Creates a test record.
    pub fn new(id: i32, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

/// Codec for [`TestRecord`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TestRecordCodec;

impl RecordCodec for TestRecordCodec {
    type Value = TestRecord;

    fn record_length(&self) -> usize {
        TEST_RECORD_LENGTH
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<TestRecord> {
        CodecError::check_length(TEST_RECORD_LENGTH, bytes.len())?;
        let mut reader = FieldReader::new(bytes);
        Ok(TestRecord {
            id: reader.get_i32()?,
            text: reader.get_text(TEXT_WIDTH)?,
        })
    }

    fn encode(&self, value: &TestRecord) -> CodecResult<Vec<u8>> {
        let mut writer = FieldWriter::new(TEST_RECORD_LENGTH);
        writer.put_i32(value.id)?;
        writer.put_text(&value.text, TEXT_WIDTH)?;
        Ok(writer.finish())
    }
}

/// The records `{1, "a"}`, `{2, "b"}`, `{3, "c"}`.
pub fn abc_records() -> Vec<TestRecord> {
    vec![
        TestRecord::new(1, "a"),
        TestRecord::new(2, "b"),
        TestRecord::new(3, "c"),
    ]
}

/// Stream configuration for [`TestRecord`] datasets.
pub fn test_stream_config() -> StreamConfig {
    StreamConfig::new(TEST_RECORD_LENGTH)
}

/// Concatenated frames around each payload.
pub fn frames<P: AsRef<[u8]>>(payloads: &[P]) -> Vec<u8> {
    payloads
        .iter()
        .flat_map(|p| encode_frame(p.as_ref()).expect("payload fits in a frame"))
        .collect()
}

/// An in-memory backend holding `records` as [`TestRecord`] frames.
pub fn memory_dataset(records: &[TestRecord]) -> InMemoryBackend {
    let payloads: Vec<Vec<u8>> = records
        .iter()
        .map(|r| TestRecordCodec.encode(r).expect("test record encodes"))
        .collect();
    InMemoryBackend::with_data(frames(&payloads))
}

/// A file-backed dataset in a temporary directory.
pub struct TestDataset {
    path: PathBuf,
    config: StreamConfig,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TestDataset {
    /// Creates an empty [`TestRecord`] dataset.
    pub fn new() -> Self {
        Self::with_config(test_stream_config())
    }

    /// Creates an empty dataset with the given stream configuration.
    pub fn with_config(config: StreamConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("dataset.dat");
        std::fs::File::create(&path).expect("Failed to create dataset file");
        Self {
            config: config.file_name(&path),
            path,
            _temp_dir: temp_dir,
        }
    }

    /// Path of the dataset file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a sibling file in the same temporary directory.
    pub fn sibling(&self, name: &str) -> PathBuf {
        self._temp_dir.path().join(name)
    }

    /// The dataset's stream configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Opens the dataset file.
    pub fn backend(&self) -> Box<dyn StorageBackend> {
        Box::new(FileBackend::open(&self.path).expect("Failed to open dataset"))
    }

    /// Opens a [`TestRecord`] writer positioned at the end of the dataset.
    pub fn writer(&self) -> RecordWriter<TestRecordCodec> {
        RecordWriter::open(self.backend(), &self.config, TestRecordCodec)
            .expect("Failed to open writer")
    }

    /// Opens a [`TestRecord`] reader at the start of the dataset.
    pub fn reader(&self) -> RecordReader<TestRecordCodec> {
        RecordReader::open(self.backend(), &self.config, TestRecordCodec)
            .expect("Failed to open reader")
    }

    /// Appends `records` and syncs.
    pub fn write_records(&self, records: &[TestRecord]) {
        let mut writer = self.writer();
        writer.write_all(records).expect("Failed to write records");
        writer
            .into_stream()
            .sync()
            .expect("Failed to sync dataset");
    }

    /// Reads every record.
    pub fn read_records(&self) -> Vec<TestRecord> {
        self.reader()
            .map(|record| record.expect("Failed to read record").value)
            .collect()
    }

    /// Raw bytes of the dataset file.
    pub fn bytes(&self) -> Vec<u8> {
        std::fs::read(&self.path).expect("Failed to read dataset file")
    }
}

impl Default for TestDataset {
    fn default() -> Self {
        Self::new()
    }
}
