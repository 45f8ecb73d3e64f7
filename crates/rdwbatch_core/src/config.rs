//! Step configuration.
//!
//! Options arrive as flat string properties (the way a batch container
//! injects them) and are turned into typed configs with
//! `from_properties`. Each config can also be built directly.

use crate::error::{CoreError, CoreResult};
use crate::skip::Limit;
use crate::stream::MAX_RECORD_LENGTH;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Option names.
pub mod options {
    /// Path of the dataset backing the stream.
    pub const FILE_NAME: &str = "FILE_NAME";
    /// Payload length of every record in bytes.
    pub const RECORD_LENGTH: &str = "RECORD_LENGTH";
    /// Forces replay positioning when `true`.
    pub const LARGE_DATASET_SUPPORT: &str = "LARGE_DATASET_SUPPORT";
    /// Skip limit; `-1` is unlimited.
    pub const MAX_SKIP_RECORDS: &str = "MAX_SKIP_RECORDS";
    /// Tolerated failure limit; `-1` is unlimited.
    pub const MAX_EXCEPTIONS: &str = "MAX_EXCEPTIONS";
    /// Skip observer identifier, or indexed list `SKIP_RECORD_OBSERVER.1..N`.
    pub const SKIP_RECORD_OBSERVER: &str = "SKIP_RECORD_OBSERVER";
    /// Tolerable failure kind, or indexed list `SKIP_EXCEPTION.1..N`.
    pub const SKIP_EXCEPTION: &str = "SKIP_EXCEPTION";
    /// Records per unit of work.
    pub const UNIT_OF_WORK_SIZE: &str = "UNIT_OF_WORK_SIZE";
}

/// Ordered string properties.
///
/// The text form is one `key=value` per line. Lines starting with `#` or
/// `!` are comments, blank lines are ignored, and keys and values are
/// trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    /// Creates an empty property set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses properties text.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a non-comment line without `=`
    /// or with an empty key.
    pub fn parse(text: &str) -> CoreResult<Self> {
        let mut props = Self::new();
        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(CoreError::configuration(
                    format!("line {}", number + 1),
                    format!("expected key=value, found '{line}'"),
                ));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(CoreError::configuration(
                    format!("line {}", number + 1),
                    "empty key",
                ));
            }
            props.set(key, value.trim());
        }
        Ok(props)
    }

    /// Reads and parses a properties file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or a configuration
    /// error if it does not parse.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Sets a property, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder form of [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Copies every entry of `other` over this set.
    pub fn merge(&mut self, other: &Self) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// Returns the value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the value for `key` or a configuration error if missing.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `key` is absent or blank.
    pub fn require(&self, key: &str) -> CoreResult<&str> {
        match self.get(key) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(CoreError::configuration(key, "required option is missing")),
        }
    }

    /// Parses the value for `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the value does not parse.
    pub fn get_parsed<T>(&self, key: &str) -> CoreResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|value| {
                value
                    .parse::<T>()
                    .map_err(|e| CoreError::configuration(key, format!("'{value}': {e}")))
            })
            .transpose()
    }

    /// Returns true when `key` is set to `true`, ignoring case.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// Reads a single-or-indexed list.
    ///
    /// If `key` itself is set, the list is that one value. Otherwise the
    /// values of `key.1`, `key.2`, ... are collected until the first gap.
    #[must_use]
    pub fn indexed_list(&self, key: &str) -> Vec<String> {
        if let Some(single) = self.get(key) {
            return vec![single.to_string()];
        }
        (1..)
            .map_while(|i| self.get(&format!("{key}.{i}")).map(str::to_string))
            .collect()
    }

    /// Replaces a single-or-indexed list with `values`, stored as `key.1`,
    /// `key.2`, ...
    ///
    /// The single `key` and any indexed entries already present are removed
    /// first.
    pub fn set_list<I, V>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let prefix = format!("{key}.");
        self.entries.retain(|k, _| {
            k.as_str() != key && !k.strip_prefix(&prefix).is_some_and(|n| n.parse::<u32>().is_ok())
        });
        for (i, value) in values.into_iter().enumerate() {
            self.set(format!("{key}.{}", i + 1), value);
        }
    }

    /// Iterates over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no entries are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_limit(props: &Properties, key: &str) -> CoreResult<Limit> {
    match props.get_parsed::<i64>(key)? {
        None => Ok(Limit::Unlimited),
        Some(value) => Limit::from_sentinel(value)
            .ok_or_else(|| CoreError::configuration(key, format!("{value} is not a valid limit"))),
    }
}

/// Configuration for opening a record stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Dataset path, when the stream is opened from configuration.
    pub file_name: Option<PathBuf>,

    /// Payload length of every record.
    pub record_length: usize,

    /// Forces replay positioning even on seekable storage.
    pub large_dataset_support: bool,
}

impl StreamConfig {
    /// Creates a stream configuration for `record_length`-byte records.
    #[must_use]
    pub const fn new(record_length: usize) -> Self {
        Self {
            file_name: None,
            record_length,
            large_dataset_support: false,
        }
    }

    /// Builds a configuration from `FILE_NAME`, `RECORD_LENGTH`, and
    /// `LARGE_DATASET_SUPPORT`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a required option is missing or
    /// the record length is out of range.
    pub fn from_properties(props: &Properties) -> CoreResult<Self> {
        let file_name = PathBuf::from(props.require(options::FILE_NAME)?);
        let record_length = props
            .get_parsed::<usize>(options::RECORD_LENGTH)?
            .ok_or_else(|| {
                CoreError::configuration(options::RECORD_LENGTH, "required option is missing")
            })?;

        let config = Self {
            file_name: Some(file_name),
            record_length,
            large_dataset_support: props.get_bool(options::LARGE_DATASET_SUPPORT),
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the dataset path.
    #[must_use]
    pub fn file_name(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_name = Some(path.into());
        self
    }

    /// Sets whether replay positioning is forced.
    #[must_use]
    pub const fn large_dataset_support(mut self, value: bool) -> Self {
        self.large_dataset_support = value;
        self
    }

    /// Checks that the record length fits in a frame.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming `RECORD_LENGTH`.
    pub fn validate(&self) -> CoreResult<()> {
        if self.record_length == 0 || self.record_length > MAX_RECORD_LENGTH {
            return Err(CoreError::configuration(
                options::RECORD_LENGTH,
                format!(
                    "{} is outside 1..={MAX_RECORD_LENGTH}",
                    self.record_length
                ),
            ));
        }
        Ok(())
    }
}

/// Configuration for a skip controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipConfig {
    /// Maximum skipped records before the step turns fatal.
    pub max_skip_records: Limit,

    /// Maximum tolerated failures before the step turns fatal.
    pub max_exceptions: Limit,

    /// Observer identifiers in notification order.
    pub observers: Vec<String>,

    /// Tolerable failure kind identifiers.
    pub tolerated_kinds: Vec<String>,
}

impl Default for SkipConfig {
    fn default() -> Self {
        Self {
            max_skip_records: Limit::Unlimited,
            max_exceptions: Limit::Unlimited,
            observers: Vec::new(),
            tolerated_kinds: Vec::new(),
        }
    }
}

impl SkipConfig {
    /// Creates a configuration with unlimited thresholds and no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from `MAX_SKIP_RECORDS`, `MAX_EXCEPTIONS`,
    /// `SKIP_RECORD_OBSERVER[.N]`, and `SKIP_EXCEPTION[.N]`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a non-integer limit or a negative
    /// limit other than `-1`.
    pub fn from_properties(props: &Properties) -> CoreResult<Self> {
        Ok(Self {
            max_skip_records: parse_limit(props, options::MAX_SKIP_RECORDS)?,
            max_exceptions: parse_limit(props, options::MAX_EXCEPTIONS)?,
            observers: props.indexed_list(options::SKIP_RECORD_OBSERVER),
            tolerated_kinds: props.indexed_list(options::SKIP_EXCEPTION),
        })
    }

    /// Sets the skip limit.
    #[must_use]
    pub const fn max_skip_records(mut self, limit: Limit) -> Self {
        self.max_skip_records = limit;
        self
    }

    /// Sets the tolerated failure limit.
    #[must_use]
    pub const fn max_exceptions(mut self, limit: Limit) -> Self {
        self.max_exceptions = limit;
        self
    }

    /// Appends an observer identifier.
    #[must_use]
    pub fn observer(mut self, id: impl Into<String>) -> Self {
        self.observers.push(id.into());
        self
    }

    /// Appends a tolerable failure kind identifier.
    #[must_use]
    pub fn tolerate(mut self, kind: impl Into<String>) -> Self {
        self.tolerated_kinds.push(kind.into());
        self
    }
}

/// Configuration for an ETL step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepConfig {
    /// Identifier used in log lines.
    pub step_id: String,

    /// Records processed per unit of work.
    pub unit_of_work_size: usize,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            step_id: "step".to_string(),
            unit_of_work_size: 1,
        }
    }
}

impl StepConfig {
    /// Creates a configuration with one record per unit of work.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from `UNIT_OF_WORK_SIZE`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the size is not a positive integer.
    pub fn from_properties(props: &Properties) -> CoreResult<Self> {
        let mut config = Self::default();
        if let Some(size) = props.get_parsed::<usize>(options::UNIT_OF_WORK_SIZE)? {
            config.unit_of_work_size = size;
        }
        config.validate()?;
        Ok(config)
    }

    /// Sets the step identifier.
    #[must_use]
    pub fn step_id(mut self, id: impl Into<String>) -> Self {
        self.step_id = id.into();
        self
    }

    /// Sets the unit of work size.
    #[must_use]
    pub fn unit_of_work_size(mut self, size: usize) -> Self {
        self.unit_of_work_size = size;
        self
    }

    /// Checks that the unit of work size is positive.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming `UNIT_OF_WORK_SIZE`.
    pub fn validate(&self) -> CoreResult<()> {
        if self.unit_of_work_size == 0 {
            return Err(CoreError::configuration(
                options::UNIT_OF_WORK_SIZE,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_properties_text() {
        let props = Properties::parse(
            "# dataset\n\
             FILE_NAME = /data/in.rdw\n\
             ! legacy comment\n\
             \n\
             RECORD_LENGTH=52\n\
             EMPTY=\n",
        )
        .unwrap();

        assert_eq!(props.len(), 3);
        assert_eq!(props.get("FILE_NAME"), Some("/data/in.rdw"));
        assert_eq!(props.get("RECORD_LENGTH"), Some("52"));
        assert_eq!(props.get("EMPTY"), Some(""));
    }

    #[test]
    fn parse_rejects_line_without_separator() {
        let err = Properties::parse("FILE_NAME\n").unwrap_err();
        assert!(err.is_configuration());
        assert!(Properties::parse("=value").is_err());
    }

    #[test]
    fn indexed_list_prefers_single_key() {
        let props = Properties::new()
            .with("SKIP_RECORD_OBSERVER", "audit")
            .with("SKIP_RECORD_OBSERVER.1", "ignored");
        assert_eq!(props.indexed_list("SKIP_RECORD_OBSERVER"), vec!["audit"]);
    }

    #[test]
    fn set_list_replaces_single_and_indexed_keys() {
        let mut props = Properties::new()
            .with("SKIP_RECORD_OBSERVER", "audit")
            .with("SKIP_RECORD_OBSERVER.1", "old")
            .with("SKIP_RECORD_OBSERVER.2", "older")
            .with("SKIP_RECORD_OBSERVER.3", "oldest")
            .with("SKIP_RECORD_OBSERVER.note", "kept");

        props.set_list("SKIP_RECORD_OBSERVER", ["log", "count"]);

        assert_eq!(props.indexed_list("SKIP_RECORD_OBSERVER"), vec!["log", "count"]);
        assert_eq!(props.get("SKIP_RECORD_OBSERVER.3"), None);
        assert_eq!(props.get("SKIP_RECORD_OBSERVER.note"), Some("kept"));
    }

    #[test]
    fn indexed_list_stops_at_gap() {
        let props = Properties::new()
            .with("SKIP_RECORD_OBSERVER.1", "first")
            .with("SKIP_RECORD_OBSERVER.2", "second")
            .with("SKIP_RECORD_OBSERVER.4", "unreachable");
        assert_eq!(
            props.indexed_list("SKIP_RECORD_OBSERVER"),
            vec!["first", "second"]
        );
        assert!(props.indexed_list("SKIP_EXCEPTION").is_empty());
    }

    #[test]
    fn stream_config_requires_file_and_length() {
        let err = StreamConfig::from_properties(&Properties::new()).unwrap_err();
        assert!(matches!(err, CoreError::Configuration { ref option, .. } if option == "FILE_NAME"));

        let props = Properties::new().with("FILE_NAME", "in.rdw");
        let err = StreamConfig::from_properties(&props).unwrap_err();
        assert!(matches!(err, CoreError::Configuration { ref option, .. } if option == "RECORD_LENGTH"));
    }

    #[test]
    fn stream_config_validates_length() {
        for bad in ["0", "65534", "-3", "abc"] {
            let props = Properties::new()
                .with("FILE_NAME", "in.rdw")
                .with("RECORD_LENGTH", bad);
            assert!(
                StreamConfig::from_properties(&props).unwrap_err().is_configuration(),
                "{bad} accepted"
            );
        }
    }

    #[test]
    fn stream_config_large_dataset_flag_is_case_insensitive() {
        let props = Properties::new()
            .with("FILE_NAME", "in.rdw")
            .with("RECORD_LENGTH", "52")
            .with("LARGE_DATASET_SUPPORT", "TRUE");
        let config = StreamConfig::from_properties(&props).unwrap();
        assert!(config.large_dataset_support);
        assert_eq!(config.record_length, 52);
        assert_eq!(config.file_name.as_deref(), Some(Path::new("in.rdw")));

        let props = props.with("LARGE_DATASET_SUPPORT", "yes");
        assert!(!StreamConfig::from_properties(&props).unwrap().large_dataset_support);
    }

    #[test]
    fn skip_config_defaults_to_unlimited() {
        let config = SkipConfig::from_properties(&Properties::new()).unwrap();
        assert_eq!(config, SkipConfig::default());
    }

    #[test]
    fn skip_config_limits() {
        let props = Properties::new()
            .with("MAX_SKIP_RECORDS", "3")
            .with("MAX_EXCEPTIONS", "-1")
            .with("SKIP_EXCEPTION.1", "io")
            .with("SKIP_EXCEPTION.2", "parse");
        let config = SkipConfig::from_properties(&props).unwrap();
        assert_eq!(config.max_skip_records, Limit::AtMost(3));
        assert_eq!(config.max_exceptions, Limit::Unlimited);
        assert_eq!(config.tolerated_kinds, vec!["io", "parse"]);

        let props = Properties::new().with("MAX_SKIP_RECORDS", "-2");
        assert!(SkipConfig::from_properties(&props).unwrap_err().is_configuration());
    }

    #[test]
    fn step_config_unit_of_work() {
        assert_eq!(StepConfig::from_properties(&Properties::new()).unwrap().unit_of_work_size, 1);

        let props = Properties::new().with("UNIT_OF_WORK_SIZE", "25");
        assert_eq!(StepConfig::from_properties(&props).unwrap().unit_of_work_size, 25);

        let props = Properties::new().with("UNIT_OF_WORK_SIZE", "0");
        assert!(StepConfig::from_properties(&props).is_err());
    }

    #[test]
    fn builder_pattern() {
        let config = SkipConfig::new()
            .max_skip_records(Limit::AtMost(10))
            .observer("audit")
            .tolerate("io");
        assert_eq!(config.max_skip_records, Limit::AtMost(10));
        assert_eq!(config.observers, vec!["audit"]);

        let stream = StreamConfig::new(80).large_dataset_support(true).file_name("x");
        assert!(stream.large_dataset_support);
        assert!(stream.validate().is_ok());
    }
}
