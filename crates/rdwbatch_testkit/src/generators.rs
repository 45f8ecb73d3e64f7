//! Property-based test generators using proptest.
//!
//! Provides strategies for generating record payloads, test records, and
//! failure patterns for skip tests.

use crate::fixtures::{TestRecord, TEXT_WIDTH};
use proptest::prelude::*;
use rdwbatch_core::stream::MAX_RECORD_LENGTH;

/// Strategy for valid record lengths, biased toward small records.
pub fn record_length_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![
        8 => 1usize..=128,
        1 => 129usize..=4096,
        1 => Just(MAX_RECORD_LENGTH),
    ]
}

/// Strategy for one payload of exactly `record_length` bytes.
pub fn payload_strategy(record_length: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), record_length)
}

/// Strategy for a dataset: a record length and up to `max_records` payloads.
pub fn dataset_strategy(max_records: usize) -> impl Strategy<Value = (usize, Vec<Vec<u8>>)> {
    (1usize..=64).prop_flat_map(move |record_length| {
        (
            Just(record_length),
            prop::collection::vec(payload_strategy(record_length), 0..=max_records),
        )
    })
}

/// Strategy for [`TestRecord`] values that fit the test layout.
pub fn test_record_strategy() -> impl Strategy<Value = TestRecord> {
    let text = format!("[a-zA-Z0-9]{{0,{TEXT_WIDTH}}}");
    (
        any::<i32>(),
        prop::string::string_regex(&text).expect("Invalid regex"),
    )
        .prop_map(|(id, text)| TestRecord { id, text })
}

/// Strategy for a batch of test records.
pub fn test_records_strategy(max_records: usize) -> impl Strategy<Value = Vec<TestRecord>> {
    prop::collection::vec(test_record_strategy(), 0..=max_records)
}

/// Strategy for which records of a run fail, as a mask.
///
/// `true` marks a record the processor skips.
pub fn skip_mask_strategy(max_records: usize) -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(prop::bool::weighted(0.2), 0..=max_records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdwbatch_codec::RecordCodec;
    use crate::fixtures::TestRecordCodec;

    proptest! {
        #[test]
        fn payloads_have_record_length((record_length, payloads) in dataset_strategy(8)) {
            for payload in &payloads {
                prop_assert_eq!(payload.len(), record_length);
            }
        }

        #[test]
        fn test_records_always_encode(record in test_record_strategy()) {
            let bytes = TestRecordCodec.encode(&record).unwrap();
            prop_assert_eq!(TestRecordCodec.decode(&bytes).unwrap(), record);
        }
    }
}
