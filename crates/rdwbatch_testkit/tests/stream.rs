//! Integration tests for framed record streams over real files.

use proptest::prelude::*;
use rdwbatch_core::{
    Checkpointable, CoreError, FramedRecordStream, Position, PositioningMode, RecordReader,
    RecordWriter, StreamConfig,
};
use rdwbatch_storage::{FileBackend, ForwardOnlyBackend, InMemoryBackend, StorageBackend};
use rdwbatch_testkit::prelude::*;
use std::io::Cursor;

const FRAME: usize = TEST_RECORD_LENGTH + 2;

#[test]
fn abc_dataset_in_replay_mode() {
    let dataset = TestDataset::with_config(test_stream_config().large_dataset_support(true));
    dataset.write_records(&abc_records());

    let mut reader = dataset.reader();
    assert_eq!(reader.positioning_mode(), PositioningMode::Replay);

    let records: Vec<TestRecord> = reader.by_ref().map(|r| r.unwrap().value).collect();
    assert_eq!(records, abc_records());

    let position = reader.current_position().unwrap();
    assert_eq!(position, Position::RecordCount(3));
    assert_eq!(
        serde_json::to_string(&position).unwrap(),
        r#"{"mode":"replay","token":"3"}"#
    );
}

#[test]
fn abc_dataset_wire_bytes() {
    let dataset = TestDataset::new();
    dataset.write_records(&abc_records());

    let bytes = dataset.bytes();
    assert_eq!(bytes.len(), 3 * FRAME);
    for (i, frame) in bytes.chunks(FRAME).enumerate() {
        assert_eq!(&frame[..2], &[0x00, 0x36]);
        assert_eq!(&frame[2..6], &(i as i32 + 1).to_be_bytes());
    }
}

#[test]
fn byte_offset_checkpoint_survives_reopen() {
    let dataset = TestDataset::new();
    dataset.write_records(&abc_records());

    let mut reader = dataset.reader();
    reader.read_next().unwrap();
    reader.read_next().unwrap();
    let token = reader.checkpoint_token().unwrap();
    assert_eq!(token.as_str(), (2 * FRAME).to_string());
    drop(reader);

    let mut reader = dataset.reader();
    reader.restore_token(&token).unwrap();
    let record = reader.read_next().unwrap().unwrap();
    assert_eq!(record.index, 2);
    assert_eq!(record.value, TestRecord::new(3, "c"));
    assert!(reader.read_next().unwrap().is_none());
}

#[test]
fn writer_restart_discards_uncommitted_output() {
    let dataset = TestDataset::new();
    let mut writer = dataset.writer();
    writer.write_all(&abc_records()[..2]).unwrap();
    let checkpoint = writer.current_position().unwrap();
    writer.write(&TestRecord::new(99, "uncommitted")).unwrap();
    drop(writer);

    let mut writer = dataset.writer();
    writer.restore(checkpoint).unwrap();
    writer.write(&TestRecord::new(3, "c")).unwrap();
    writer.flush().unwrap();
    drop(writer);

    assert_eq!(dataset.read_records(), abc_records());
}

#[test]
fn torn_tail_is_reported_and_repaired() {
    let dataset = TestDataset::new();
    dataset.write_records(&abc_records());
    let corruption = Corruption::TruncateTail(10);
    corruption.apply_to_file(dataset.path(), FRAME);
    assert_eq!(corruption.intact_records(3, FRAME), 2);

    let mut reader = dataset.reader();
    assert!(reader.read_next().unwrap().is_some());
    assert!(reader.read_next().unwrap().is_some());
    let err = reader.read_next().unwrap_err();
    assert!(matches!(err, CoreError::Framing { record: 2, offset, .. } if offset == 2 * FRAME as u64));
    drop(reader);

    let err = RecordWriter::open(dataset.backend(), dataset.config(), TestRecordCodec).unwrap_err();
    assert!(err.is_framing());

    let mut stream = FramedRecordStream::open(dataset.backend(), dataset.config()).unwrap();
    stream.truncate_at_record(2).unwrap();
    drop(stream);
    assert_eq!(dataset.read_records(), abc_records()[..2].to_vec());
}

#[test]
fn bad_length_stops_reader_at_damaged_record() {
    let dataset = TestDataset::new();
    dataset.write_records(&abc_records());
    Corruption::BadLength { record: 1, length: 52 }.apply_to_file(dataset.path(), FRAME);

    let mut reader = dataset.reader();
    assert_eq!(reader.read_next().unwrap().unwrap().value, TestRecord::new(1, "a"));
    assert!(reader.read_next().unwrap_err().is_framing());
}

#[test]
fn stray_bytes_after_last_record() {
    let dataset = TestDataset::new();
    dataset.write_records(&abc_records());
    Corruption::StrayBytes(vec![0x00]).apply_to_file(dataset.path(), FRAME);

    let mut reader = dataset.reader();
    for _ in 0..3 {
        assert!(reader.read_next().unwrap().is_some());
    }
    assert!(reader.read_next().unwrap_err().is_framing());
}

#[test]
fn forward_only_input_replays_to_restart_point() {
    let bytes = memory_dataset(&abc_records()).data();
    let backend = ForwardOnlyBackend::reader(Cursor::new(bytes));
    let mut reader = RecordReader::open(Box::new(backend), &test_stream_config(), TestRecordCodec).unwrap();
    assert_eq!(reader.positioning_mode(), PositioningMode::Replay);

    reader.restore(Position::RecordCount(2)).unwrap();
    assert_eq!(reader.read_next().unwrap().unwrap().value, TestRecord::new(3, "c"));

    let err = reader.restore(Position::RecordCount(1)).unwrap_err();
    assert!(matches!(err, CoreError::SeekUnsupported { .. }));
}

#[test]
fn forward_only_output_cannot_rewind() {
    let config = test_stream_config();
    let backend = ForwardOnlyBackend::writer(Vec::new());
    let mut writer = RecordWriter::open(Box::new(backend), &config, TestRecordCodec).unwrap();
    writer.write_all(&abc_records()).unwrap();

    assert_eq!(writer.current_position().unwrap(), Position::RecordCount(3));
    assert!(writer.restore(Position::RecordCount(3)).is_ok());
    assert!(matches!(
        writer.restore(Position::RecordCount(1)),
        Err(CoreError::SeekUnsupported { .. })
    ));
}

#[test]
fn exclusive_output_lock() {
    let dataset = TestDataset::new();
    let _held = FileBackend::open_exclusive(dataset.path()).unwrap();
    assert!(FileBackend::open_exclusive(dataset.path()).is_err());
}

proptest! {
    #[test]
    fn written_payloads_read_back((record_length, payloads) in dataset_strategy(16)) {
        let config = StreamConfig::new(record_length);
        let mut out = FramedRecordStream::open_writer(Box::new(InMemoryBackend::new()), &config).unwrap();
        for payload in &payloads {
            out.write(payload).unwrap();
        }
        let backend = out.into_backend();
        prop_assert_eq!(backend.size().unwrap(), (payloads.len() * (record_length + 2)) as u64);

        let mut input = FramedRecordStream::open(backend, &config).unwrap();
        for payload in &payloads {
            let record = input.read_next().unwrap().unwrap();
            prop_assert_eq!(&record.bytes, payload);
        }
        prop_assert!(input.read_next().unwrap().is_none());
    }

    #[test]
    fn restore_resumes_at_any_checkpoint(
        records in test_records_strategy(12),
        cut in 0usize..=12,
        replay in any::<bool>(),
    ) {
        let cut = cut.min(records.len());
        let config = test_stream_config().large_dataset_support(replay);
        let mut reader =
            RecordReader::open(Box::new(memory_dataset(&records)), &config, TestRecordCodec).unwrap();
        for _ in 0..cut {
            reader.read_next().unwrap();
        }
        let checkpoint = reader.current_position().unwrap();

        let mut resumed =
            RecordReader::open(Box::new(memory_dataset(&records)), &config, TestRecordCodec).unwrap();
        resumed.restore(checkpoint).unwrap();
        let rest: Vec<TestRecord> = resumed.map(|r| r.unwrap().value).collect();
        prop_assert_eq!(rest, records[cut..].to_vec());
    }
}
