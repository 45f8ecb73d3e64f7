//! Benchmark utilities.

use rdwbatch_core::{FramedRecordStream, StreamConfig};
use rdwbatch_storage::{InMemoryBackend, StorageBackend};
use rdwbatch_testkit::TestRecord;

/// Deterministic payload of `size` bytes, varied by `seed`.
pub fn pattern_data(seed: usize, size: usize) -> Vec<u8> {
    (0..size).map(|i| ((i + seed * 31) % 251) as u8).collect()
}

/// An in-memory dataset of `count` records of `record_length` bytes.
pub fn framed_dataset(count: usize, record_length: usize) -> InMemoryBackend {
    let config = StreamConfig::new(record_length);
    let mut out = FramedRecordStream::open_writer(Box::new(InMemoryBackend::new()), &config)
        .expect("open in-memory writer");
    for i in 0..count {
        out.write(&pattern_data(i, record_length)).expect("write record");
    }
    let backend = out.into_backend();
    InMemoryBackend::with_data(
        backend
            .read_at(0, backend.size().expect("size") as usize)
            .expect("read back"),
    )
}

/// `count` test records with short text.
pub fn test_records(count: usize) -> Vec<TestRecord> {
    (0..count)
        .map(|i| TestRecord::new(i as i32, format!("record {i}")))
        .collect()
}
