//! Dump command implementation.

use super::open_input;
use rdwbatch_core::{RawRecord, StreamConfig};
use serde::Serialize;

/// Record representation for output.
#[derive(Debug, Serialize)]
pub struct RecordInfo {
    /// Zero-based record number.
    pub index: u64,
    /// Offset of the record's header in the dataset.
    pub offset: u64,
    /// Payload, hex-encoded.
    pub hex: String,
    /// Payload with non-printable bytes shown as `.`.
    pub text: String,
}

impl From<RawRecord> for RecordInfo {
    fn from(record: RawRecord) -> Self {
        Self {
            index: record.index,
            offset: record.offset,
            hex: hex_encode(&record.bytes),
            text: printable(&record.bytes),
        }
    }
}

/// Runs the dump command.
pub fn run(
    config: &StreamConfig,
    from: u64,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut stream = open_input(config)?;
    stream.seek_to_record(from)?;

    let max_records = limit.unwrap_or(usize::MAX);
    let mut records = Vec::new();
    while records.len() < max_records {
        match stream.read_next()? {
            Some(record) => records.push(RecordInfo::from(record)),
            None => break,
        }
    }

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => {
            print_text_output(&records);
        }
    }

    Ok(())
}

fn print_text_output(records: &[RecordInfo]) {
    println!("Records ({} total)", records.len());
    println!("================");
    println!();

    for record in records {
        println!("[{:08}] @{:<10} {}", record.index, record.offset, record.text);
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn printable(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                char::from(b)
            } else {
                '.'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_info_renders_payload() {
        let info = RecordInfo::from(RawRecord {
            index: 2,
            offset: 12,
            bytes: vec![b'a', 0x00, b' ', 0xff],
        });
        assert_eq!(info.hex, "610020ff");
        assert_eq!(info.text, "a. .");
    }
}
