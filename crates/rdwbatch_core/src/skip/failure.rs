//! Per-record failures reported by a unit of work.

use std::error::Error;
use std::fmt;

/// Boxed error carried through the controller.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// A record that could not be processed and should be skipped.
pub struct SkipRecord<R> {
    record: R,
    reason: Option<String>,
    source: Option<BoxError>,
}

impl<R> SkipRecord<R> {
    /// Skips `record` without a stated reason.
    pub fn new(record: R) -> Self {
        Self {
            record,
            reason: None,
            source: None,
        }
    }

    /// Attaches a human-readable reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the error that caused the skip.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The skipped record.
    pub fn record(&self) -> &R {
        &self.record
    }

    /// Why the record was skipped, if known.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// The error behind the skip, if any.
    pub fn source(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Replaces the record, keeping the reason and source.
    pub fn map_record<S>(self, f: impl FnOnce(R) -> S) -> SkipRecord<S> {
        SkipRecord {
            record: f(self.record),
            reason: self.reason,
            source: self.source,
        }
    }

    /// Takes the record back.
    pub fn into_record(self) -> R {
        self.record
    }
}

impl<R: fmt::Debug> fmt::Debug for SkipRecord<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkipRecord")
            .field("record", &self.record)
            .field("reason", &self.reason)
            .field("source", &self.source.as_ref().map(ToString::to_string))
            .finish()
    }
}

impl<R> fmt::Display for SkipRecord<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.reason, &self.source) {
            (Some(reason), Some(source)) => write!(f, "record skipped: {reason}: {source}"),
            (Some(reason), None) => write!(f, "record skipped: {reason}"),
            (None, Some(source)) => write!(f, "record skipped: {source}"),
            (None, None) => f.write_str("record skipped"),
        }
    }
}

/// Why a unit of work did not finish.
///
/// Any error type converts into [`Failure::Error`] with `?`. A skip has to be
/// requested explicitly because it hands the record to the observers.
pub enum Failure<R> {
    /// The record should be skipped; processing may continue.
    Skip(SkipRecord<R>),
    /// An error. Continues only if its type is registered as tolerable.
    Error(BoxError),
}

impl<R> Failure<R> {
    /// Skips `record` without a stated reason.
    pub fn skip(record: R) -> Self {
        Self::Skip(SkipRecord::new(record))
    }

    /// Skips `record` with a reason.
    pub fn skip_because(record: R, reason: impl Into<String>) -> Self {
        Self::Skip(SkipRecord::new(record).with_reason(reason))
    }

    /// Wraps an error.
    pub fn error(err: impl Into<BoxError>) -> Self {
        Self::Error(err.into())
    }

    /// Returns true for a skip.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip(_))
    }

    /// Replaces the record of a skip, leaving errors unchanged.
    pub fn map_record<S>(self, f: impl FnOnce(R) -> S) -> Failure<S> {
        match self {
            Self::Skip(skip) => Failure::Skip(skip.map_record(f)),
            Self::Error(err) => Failure::Error(err),
        }
    }

    /// The underlying error, if any.
    pub fn source(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        match self {
            Self::Skip(skip) => skip.source(),
            Self::Error(err) => Some(err.as_ref()),
        }
    }
}

impl<R, E> From<E> for Failure<R>
where
    E: Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self::Error(Box::new(err))
    }
}

impl<R: fmt::Debug> fmt::Debug for Failure<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip(skip) => f.debug_tuple("Skip").field(skip).finish(),
            Self::Error(err) => f.debug_tuple("Error").field(err).finish(),
        }
    }
}

impl<R> fmt::Display for Failure<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip(skip) => fmt::Display::fmt(skip, f),
            Self::Error(err) => fmt::Display::fmt(err, f),
        }
    }
}
