//! Fuzz testing harnesses for rdwbatch.
//!
//! This module provides fuzz targets that can be used with cargo-fuzz
//! or other fuzzing frameworks. Every target must return normally for
//! any input; a panic is a bug.

use crate::fixtures::frames;
use rdwbatch_core::skip::{ControllerState, SkipController, SkipPolicy};
use rdwbatch_core::stream::HEADER_SIZE;
use rdwbatch_core::{
    CoreError, Failure, FramedRecordStream, Limit, Properties, RestartToken, SkipConfig,
    StepOutcome, StreamConfig,
};
use rdwbatch_storage::InMemoryBackend;

/// Fuzz target for frame parsing.
///
/// The first byte picks a record length; the rest is read as a dataset.
/// Reading must stop at a clean end or a framing error, never panic, and
/// the cursor must only ever land on frame boundaries.
pub fn fuzz_frame_reader(data: &[u8]) {
    let Some((&first, dataset)) = data.split_first() else {
        return;
    };
    let record_length = usize::from(first % 16) + 1;
    let frame_size = record_length + HEADER_SIZE;
    let config = StreamConfig::new(record_length);

    let backend = InMemoryBackend::with_data(dataset.to_vec());
    let Ok(mut stream) = FramedRecordStream::open(Box::new(backend), &config) else {
        return;
    };

    loop {
        match stream.read_next() {
            Ok(Some(record)) => assert_eq!(record.bytes.len(), record_length),
            Ok(None) => {
                assert_eq!(stream.offset(), dataset.len() as u64);
                break;
            }
            Err(err) => {
                assert!(err.is_framing(), "unexpected error: {err}");
                break;
            }
        }
        assert_eq!(stream.offset(), stream.records() * frame_size as u64);
    }
}

/// Fuzz target for damaged datasets.
///
/// Builds well-formed frames from the input, flips one header byte, and
/// checks that the reader stops exactly at the damaged record.
pub fn fuzz_damaged_header(data: &[u8]) {
    if data.len() < 3 {
        return;
    }
    let record_length = usize::from(data[0] % 8) + 1;
    let frame_size = record_length + HEADER_SIZE;
    let payloads: Vec<&[u8]> = data[2..].chunks_exact(record_length).collect();
    if payloads.is_empty() {
        return;
    }

    let damaged = usize::from(data[1]) % payloads.len();
    let mut bytes = frames(&payloads);
    bytes[damaged * frame_size + 1] ^= 0x80;

    let config = StreamConfig::new(record_length);
    let backend = InMemoryBackend::with_data(bytes);
    let mut stream =
        FramedRecordStream::open(Box::new(backend), &config).expect("in-memory open succeeds");

    for _ in 0..damaged {
        assert!(stream.read_next().expect("intact record").is_some());
    }
    match stream.read_next() {
        Err(CoreError::Framing { record, .. }) => assert_eq!(record, damaged as u64),
        other => panic!("expected framing error at record {damaged}, got {other:?}"),
    }
}

/// Fuzz target for properties parsing and option resolution.
pub fn fuzz_properties(data: &[u8]) {
    let text = String::from_utf8_lossy(data);
    let Ok(props) = Properties::parse(&text) else {
        return;
    };
    let _ = StreamConfig::from_properties(&props);
    let _ = SkipConfig::from_properties(&props);
}

/// Fuzz target for restart tokens.
///
/// Anything that parses must print back to the same number.
pub fn fuzz_restart_token(data: &[u8]) {
    let text = String::from_utf8_lossy(data);
    if let Ok(token) = text.parse::<RestartToken>() {
        let reparsed: RestartToken = token.value().to_string().parse().expect("reparse");
        assert_eq!(reparsed.value(), token.value());
    }
}

/// Fuzz target for the skip controller.
///
/// The first byte is the skip limit; each following byte is one unit of
/// work that either succeeds or skips. The controller must turn fatal on
/// exactly the `limit`-th skip and refuse all work afterwards.
pub fn fuzz_skip_controller(data: &[u8]) {
    let Some((&limit, units)) = data.split_first() else {
        return;
    };
    let limit = u64::from(limit % 8);
    let mut controller =
        SkipController::new("fuzz", SkipPolicy::<u8>::new().max_skip_records(Limit::AtMost(limit)));

    let mut skips = 0u64;
    for &unit in units {
        let was_fatal = controller.state() == ControllerState::Fatal;
        let skip = unit % 2 == 1;
        let result = controller.run_unit_of_work(|| {
            if skip {
                Err(Failure::skip(unit))
            } else {
                Ok(StepOutcome::Continue)
            }
        });

        if was_fatal {
            assert!(result.is_err());
            continue;
        }
        if skip {
            skips += 1;
            assert_eq!(result.is_err(), skips >= limit);
        } else {
            assert!(result.is_ok());
        }
        assert_eq!(controller.skipped_records(), skips);
    }
}
