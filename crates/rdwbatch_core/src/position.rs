//! Restart positions and the checkpoint contract.
//!
//! A record stream can be repositioned in two ways:
//!
//! - **Byte offset**: the position is the byte offset of the next frame.
//!   Every frame has the same size, so record `n` starts at
//!   `n * frame_size` and restoring is a single seek.
//! - **Replay**: the position is a record count. Restoring consumes that
//!   many records from the start of the stream. Required for storage that
//!   cannot seek, and used for very large datasets when configured.
//!
//! Both are externalized as a [`RestartToken`]: the decimal string form of
//! the position value.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a stream externalizes and restores its position.
///
/// Fixed when the stream is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositioningMode {
    /// Position is a byte offset; restore seeks directly.
    #[default]
    ByteOffset,
    /// Position is a record count; restore replays records sequentially.
    Replay,
}

impl PositioningMode {
    /// Chooses the mode for a stream.
    ///
    /// Replay is used when large-dataset support is requested or the
    /// backend cannot seek; byte offsets otherwise.
    #[must_use]
    pub const fn resolve(large_dataset_support: bool, seekable: bool) -> Self {
        if large_dataset_support || !seekable {
            Self::Replay
        } else {
            Self::ByteOffset
        }
    }

    /// Returns the mode name used in configuration and checkpoint files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ByteOffset => "byte-offset",
            Self::Replay => "replay",
        }
    }
}

impl fmt::Display for PositioningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositioningMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "byte-offset" => Ok(Self::ByteOffset),
            "replay" => Ok(Self::Replay),
            other => Err(CoreError::invalid_position(format!(
                "unknown positioning mode '{other}'"
            ))),
        }
    }
}

/// A point in a record stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "PositionRepr", try_from = "PositionRepr")]
pub enum Position {
    /// Byte offset of the next frame from the start of storage.
    ByteOffset(u64),
    /// Number of records consumed or produced.
    RecordCount(u64),
}

impl Position {
    /// The position at the start of a stream in `mode`.
    #[must_use]
    pub const fn start(mode: PositioningMode) -> Self {
        match mode {
            PositioningMode::ByteOffset => Self::ByteOffset(0),
            PositioningMode::Replay => Self::RecordCount(0),
        }
    }

    /// Builds a position of `mode` from a raw value.
    #[must_use]
    pub const fn new(mode: PositioningMode, value: u64) -> Self {
        match mode {
            PositioningMode::ByteOffset => Self::ByteOffset(value),
            PositioningMode::Replay => Self::RecordCount(value),
        }
    }

    /// The mode this position belongs to.
    #[must_use]
    pub const fn mode(&self) -> PositioningMode {
        match self {
            Self::ByteOffset(_) => PositioningMode::ByteOffset,
            Self::RecordCount(_) => PositioningMode::Replay,
        }
    }

    /// The raw value: a byte offset or a record count.
    #[must_use]
    pub const fn value(&self) -> u64 {
        match self {
            Self::ByteOffset(v) | Self::RecordCount(v) => *v,
        }
    }

    /// Externalizes this position as a restart token.
    #[must_use]
    pub fn to_token(&self) -> RestartToken {
        RestartToken::from(self.value())
    }

    /// Parses a restart token produced by a stream in `mode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a decimal integer.
    pub fn from_token(mode: PositioningMode, token: &str) -> CoreResult<Self> {
        let token: RestartToken = token.parse()?;
        Ok(Self::new(mode, token.value()))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByteOffset(v) => write!(f, "byte offset {v}"),
            Self::RecordCount(v) => write!(f, "record {v}"),
        }
    }
}

/// Serialized form of a [`Position`].
#[derive(Serialize, Deserialize)]
struct PositionRepr {
    mode: PositioningMode,
    token: RestartToken,
}

impl From<Position> for PositionRepr {
    fn from(position: Position) -> Self {
        Self {
            mode: position.mode(),
            token: position.to_token(),
        }
    }
}

impl TryFrom<PositionRepr> for Position {
    type Error = CoreError;

    fn try_from(repr: PositionRepr) -> Result<Self, Self::Error> {
        Ok(Self::new(repr.mode, repr.token.value()))
    }
}

/// Decimal string form of a position value.
///
/// Round-trips every `u64` without loss.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RestartToken {
    text: String,
    value: u64,
}

impl RestartToken {
    /// The token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The decoded position value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.value
    }
}

impl From<u64> for RestartToken {
    fn from(value: u64) -> Self {
        Self {
            text: value.to_string(),
            value,
        }
    }
}

impl FromStr for RestartToken {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::invalid_position(format!(
                "restart token '{s}' is not a decimal integer"
            )));
        }
        let value = text.parse::<u64>().map_err(|e| {
            CoreError::invalid_position(format!("restart token '{s}' out of range: {e}"))
        })?;
        Ok(Self::from(value))
    }
}

impl TryFrom<String> for RestartToken {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RestartToken> for String {
    fn from(token: RestartToken) -> Self {
        token.text
    }
}

impl fmt::Display for RestartToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Something whose position can be checkpointed and restored.
///
/// The checkpoint transport calls [`current_position`](Self::current_position)
/// at a step boundary, persists the token, and on restart hands it back to
/// [`restore`](Self::restore).
pub trait Checkpointable {
    /// The positioning mode fixed at open.
    fn positioning_mode(&self) -> PositioningMode;

    /// Returns the current restart position, flushing buffered writes first.
    ///
    /// # Errors
    ///
    /// Returns an error if buffered data cannot be flushed.
    fn current_position(&mut self) -> CoreResult<Position>;

    /// Restores a position produced by [`current_position`](Self::current_position).
    ///
    /// Restoring the same position twice leaves the stream in the same place.
    ///
    /// # Errors
    ///
    /// Returns an error if the position belongs to another mode, lies past
    /// the end of the stream, or the backend cannot reach it.
    fn restore(&mut self, position: Position) -> CoreResult<()>;

    /// Returns the current position as a restart token.
    ///
    /// # Errors
    ///
    /// Same as [`current_position`](Self::current_position).
    fn checkpoint_token(&mut self) -> CoreResult<RestartToken> {
        Ok(self.current_position()?.to_token())
    }

    /// Restores from a restart token.
    ///
    /// # Errors
    ///
    /// Same as [`restore`](Self::restore).
    fn restore_token(&mut self, token: &RestartToken) -> CoreResult<()> {
        let position = Position::new(self.positioning_mode(), token.value());
        self.restore(position)
    }
}
