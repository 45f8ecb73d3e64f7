//! Frame encoding test vectors.
//!
//! Fixed byte-level expectations for RDW frames, so that datasets written
//! by this crate stay readable by other RDW tooling.

use serde::{Deserialize, Serialize};

/// A frame encoding test vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Payload length the dataset is opened with.
    pub record_length: usize,
    /// Dataset bytes (hex-encoded).
    pub dataset_hex: String,
    /// Expected payloads (hex-encoded), in order.
    pub expected_payloads: Vec<String>,
    /// Record at which a framing error is expected, if any.
    pub expected_framing_error: Option<u64>,
}

/// RDW frame test vectors.
pub fn frame_vectors() -> Vec<FrameVector> {
    vec![
        FrameVector {
            id: "empty".into(),
            description: "Empty dataset".into(),
            record_length: 4,
            dataset_hex: "".into(),
            expected_payloads: vec![],
            expected_framing_error: None,
        },
        FrameVector {
            id: "single_byte_record".into(),
            description: "Smallest record: header 0x0003".into(),
            record_length: 1,
            dataset_hex: "000341".into(),
            expected_payloads: vec!["41".into()],
            expected_framing_error: None,
        },
        FrameVector {
            id: "two_records".into(),
            description: "Two 4-byte records".into(),
            record_length: 4,
            dataset_hex: "000661626364000665666768".into(),
            expected_payloads: vec!["61626364".into(), "65666768".into()],
            expected_framing_error: None,
        },
        FrameVector {
            id: "header_counts_itself".into(),
            description: "Header holding the payload length only is rejected".into(),
            record_length: 4,
            dataset_hex: "000461626364".into(),
            expected_payloads: vec![],
            expected_framing_error: Some(0),
        },
        FrameVector {
            id: "truncated_header".into(),
            description: "One stray byte after a complete record".into(),
            record_length: 2,
            dataset_hex: "0004616200".into(),
            expected_payloads: vec!["6162".into()],
            expected_framing_error: Some(1),
        },
        FrameVector {
            id: "truncated_payload".into(),
            description: "Second record cut short by a crashed writer".into(),
            record_length: 2,
            dataset_hex: "00046162000463".into(),
            expected_payloads: vec!["6162".into()],
            expected_framing_error: Some(1),
        },
        FrameVector {
            id: "big_endian_length".into(),
            description: "A 300-byte record has header 0x012e".into(),
            record_length: 300,
            dataset_hex: format!("012e{}", "00".repeat(300)),
            expected_payloads: vec!["00".repeat(300)],
            expected_framing_error: None,
        },
    ]
}

/// Decodes a hex string.
///
/// # Panics
///
/// Panics on malformed hex; vectors are fixed test data.
pub fn hex_decode(hex: &str) -> Vec<u8> {
    assert!(hex.len() % 2 == 0, "odd-length hex: {hex}");
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).expect("valid hex"))
        .collect()
}

/// Encodes bytes as lowercase hex.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
