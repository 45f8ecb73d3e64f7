//! CLI command implementations.

pub mod copy;
pub mod count;
pub mod dump;
pub mod truncate;
pub mod verify;

use clap::Args;
use rdwbatch_core::config::options;
use rdwbatch_core::{FramedRecordStream, Properties, StreamConfig};
use rdwbatch_storage::{FileBackend, ForwardOnlyBackend, StorageBackend};
use std::path::{Path, PathBuf};

/// Path that selects standard input or output instead of a file.
const STDIO_PATH: &str = "-";

/// Options that locate a dataset and describe its records.
#[derive(Args, Debug, Clone)]
pub struct DatasetArgs {
    /// Dataset file (`-` for standard input)
    #[arg(short, long, visible_alias = "input")]
    pub file: Option<PathBuf>,

    /// Payload length of every record
    #[arg(short, long)]
    pub record_length: Option<usize>,

    /// Position by record replay instead of byte offset
    #[arg(long)]
    pub large_dataset_support: bool,
}

impl DatasetArgs {
    /// Overlays these flags on `properties`.
    pub fn apply(&self, properties: &mut Properties) {
        if let Some(file) = &self.file {
            properties.set(options::FILE_NAME, file.display().to_string());
        }
        if let Some(length) = self.record_length {
            properties.set(options::RECORD_LENGTH, length.to_string());
        }
        if self.large_dataset_support {
            properties.set(options::LARGE_DATASET_SUPPORT, "true");
        }
    }

    /// Resolves the stream configuration from `properties` and these flags.
    pub fn stream_config(
        &self,
        properties: &Properties,
    ) -> Result<StreamConfig, Box<dyn std::error::Error>> {
        let mut properties = properties.clone();
        self.apply(&mut properties);
        Ok(StreamConfig::from_properties(&properties)?)
    }
}

/// Loads the properties file, or returns empty properties.
pub fn load_properties(path: Option<&Path>) -> Result<Properties, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(Properties::load(path)?),
        None => Ok(Properties::new()),
    }
}

/// Returns the dataset path of a configuration built from properties.
pub fn dataset_path(config: &StreamConfig) -> Result<&Path, Box<dyn std::error::Error>> {
    config
        .file_name
        .as_deref()
        .ok_or_else(|| "Dataset file required".into())
}

/// Returns whether `path` names standard input or output.
pub fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == STDIO_PATH
}

/// Opens the configured dataset for reading.
pub fn open_input(config: &StreamConfig) -> Result<FramedRecordStream, Box<dyn std::error::Error>> {
    let path = dataset_path(config)?;
    let backend: Box<dyn StorageBackend> = if is_stdio(path) {
        Box::new(ForwardOnlyBackend::reader(std::io::stdin()))
    } else {
        Box::new(FileBackend::open_read_only(path)?)
    };
    Ok(FramedRecordStream::open(backend, config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_properties() {
        let properties = Properties::new()
            .with(options::FILE_NAME, "from-file.dat")
            .with(options::RECORD_LENGTH, "80");
        let args = DatasetArgs {
            file: None,
            record_length: Some(52),
            large_dataset_support: true,
        };

        let config = args.stream_config(&properties).unwrap();
        assert_eq!(config.file_name.as_deref(), Some(Path::new("from-file.dat")));
        assert_eq!(config.record_length, 52);
        assert!(config.large_dataset_support);
    }

    #[test]
    fn missing_record_length_is_rejected() {
        let args = DatasetArgs {
            file: Some(PathBuf::from("x.dat")),
            record_length: None,
            large_dataset_support: false,
        };
        let err = args.stream_config(&Properties::new()).unwrap_err();
        assert!(err.to_string().contains(options::RECORD_LENGTH));
    }

    #[test]
    fn dash_is_stdio() {
        assert!(is_stdio(Path::new("-")));
        assert!(!is_stdio(Path::new("data.dat")));
    }
}
