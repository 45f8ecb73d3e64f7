//! Skip policy: thresholds, tolerable failure kinds, and observers.

use crate::config::SkipConfig;
use crate::error::CoreResult;
use crate::skip::observer::SkipObserver;
use crate::skip::registry::{FailureKindRegistry, ObserverRegistry};
use std::any::{type_name, TypeId};
use std::error::Error;
use std::fmt;

/// A threshold on skipped records or tolerated failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Limit {
    /// Fatal once the count reaches `n`. `AtMost(0)` fails on the first
    /// occurrence.
    AtMost(u64),
    /// Never fatal.
    #[default]
    Unlimited,
}

impl Limit {
    /// Configuration value meaning "no limit".
    pub const UNLIMITED_SENTINEL: i64 = -1;

    /// Interprets a configured integer: `-1` is unlimited, `n >= 0` is
    /// `AtMost(n)`, anything else is invalid.
    #[must_use]
    pub fn from_sentinel(value: i64) -> Option<Self> {
        match value {
            Self::UNLIMITED_SENTINEL => Some(Self::Unlimited),
            n => u64::try_from(n).ok().map(Self::AtMost),
        }
    }

    /// Returns true once `count` occurrences hit the limit.
    #[must_use]
    pub const fn is_reached(self, count: u64) -> bool {
        match self {
            Self::AtMost(n) => count >= n,
            Self::Unlimited => false,
        }
    }

    /// The numeric limit, if finite.
    #[must_use]
    pub const fn value(self) -> Option<u64> {
        match self {
            Self::AtMost(n) => Some(n),
            Self::Unlimited => None,
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtMost(n) => write!(f, "{n}"),
            Self::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// An error type whose failures are tolerated.
///
/// Matching is by exact type identity of the reported error: wrapping a
/// tolerated error in another type hides it.
#[derive(Clone, Copy)]
pub struct FailureKind {
    name: &'static str,
    type_id: TypeId,
    matches: fn(&(dyn Error + 'static)) -> bool,
}

fn is_kind<E: Error + 'static>(err: &(dyn Error + 'static)) -> bool {
    err.is::<E>()
}

impl FailureKind {
    /// The kind of errors of type `E`.
    #[must_use]
    pub fn of<E: Error + 'static>() -> Self {
        Self {
            name: type_name::<E>(),
            type_id: TypeId::of::<E>(),
            matches: is_kind::<E>,
        }
    }

    /// Type name of the kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true if `err` is exactly of this kind.
    #[must_use]
    pub fn matches(&self, err: &(dyn Error + 'static)) -> bool {
        (self.matches)(err)
    }
}

impl PartialEq for FailureKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for FailureKind {}

impl fmt::Debug for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FailureKind").field(&self.name).finish()
    }
}

/// How a controller reacts to skips and failures.
pub struct SkipPolicy<R> {
    pub(crate) max_skip_records: Limit,
    pub(crate) max_tolerated_failures: Limit,
    pub(crate) tolerated: Vec<FailureKind>,
    pub(crate) observers: Vec<Box<dyn SkipObserver<R> + Send>>,
}

impl<R> Default for SkipPolicy<R> {
    fn default() -> Self {
        Self {
            max_skip_records: Limit::Unlimited,
            max_tolerated_failures: Limit::Unlimited,
            tolerated: Vec::new(),
            observers: Vec::new(),
        }
    }
}

impl<R> SkipPolicy<R> {
    /// Unlimited thresholds, no tolerated kinds, no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a policy from configuration, resolving identifiers through
    /// the registries.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown observer or kind.
    pub fn from_config(
        config: &SkipConfig,
        observers: &ObserverRegistry<R>,
        kinds: &FailureKindRegistry,
    ) -> CoreResult<Self> {
        let mut policy = Self::new()
            .max_skip_records(config.max_skip_records)
            .max_tolerated_failures(config.max_exceptions);

        for id in &config.observers {
            policy.observers.push(observers.create(id)?);
            tracing::info!(observer = %id, position = policy.observers.len(), "registered skip observer");
        }
        for id in &config.tolerated_kinds {
            let kind = kinds.get(id)?;
            tracing::info!(kind = %id, type_name = kind.name(), "registered tolerable failure kind");
            policy.tolerated.push(kind);
        }
        Ok(policy)
    }

    /// Sets the skip limit.
    #[must_use]
    pub fn max_skip_records(mut self, limit: Limit) -> Self {
        self.max_skip_records = limit;
        self
    }

    /// Sets the tolerated failure limit.
    #[must_use]
    pub fn max_tolerated_failures(mut self, limit: Limit) -> Self {
        self.max_tolerated_failures = limit;
        self
    }

    /// Tolerates failures of type `E`.
    #[must_use]
    pub fn tolerate<E: Error + 'static>(self) -> Self {
        self.tolerate_kind(FailureKind::of::<E>())
    }

    /// Tolerates failures of `kind`.
    #[must_use]
    pub fn tolerate_kind(mut self, kind: FailureKind) -> Self {
        if !self.tolerated.contains(&kind) {
            self.tolerated.push(kind);
        }
        self
    }

    /// Appends an observer. Observers are notified in the order added.
    #[must_use]
    pub fn observe(mut self, observer: impl SkipObserver<R> + Send + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Appends a closure observer.
    #[must_use]
    pub fn observe_fn<F>(self, f: F) -> Self
    where
        F: FnMut(&R, &super::SkipStatus<'_>) -> Result<(), super::BoxError> + Send + 'static,
    {
        self.observe(f)
    }

    /// The skip limit.
    #[must_use]
    pub fn skip_limit(&self) -> Limit {
        self.max_skip_records
    }

    /// The tolerated failure limit.
    #[must_use]
    pub fn tolerated_limit(&self) -> Limit {
        self.max_tolerated_failures
    }

    /// Registered tolerable kinds.
    #[must_use]
    pub fn tolerated_kinds(&self) -> &[FailureKind] {
        &self.tolerated
    }

    /// Number of observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// The tolerable kind `err` belongs to, if any.
    #[must_use]
    pub fn tolerated_kind(&self, err: &(dyn Error + 'static)) -> Option<FailureKind> {
        self.tolerated.iter().copied().find(|kind| kind.matches(err))
    }
}

impl<R> fmt::Debug for SkipPolicy<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkipPolicy")
            .field("max_skip_records", &self.max_skip_records)
            .field("max_tolerated_failures", &self.max_tolerated_failures)
            .field("tolerated", &self.tolerated)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdwbatch_codec::CodecError;
    use std::io;

    #[test]
    fn sentinel() {
        assert_eq!(Limit::from_sentinel(-1), Some(Limit::Unlimited));
        assert_eq!(Limit::from_sentinel(0), Some(Limit::AtMost(0)));
        assert_eq!(Limit::from_sentinel(12), Some(Limit::AtMost(12)));
        assert_eq!(Limit::from_sentinel(-2), None);
    }

    #[test]
    fn limit_reached() {
        assert!(Limit::AtMost(0).is_reached(1));
        assert!(!Limit::AtMost(3).is_reached(2));
        assert!(Limit::AtMost(3).is_reached(3));
        assert!(!Limit::Unlimited.is_reached(u64::MAX));
    }

    #[test]
    fn kind_matches_exact_type() {
        let kind = FailureKind::of::<io::Error>();
        let io_err = io::Error::other("boom");
        assert!(kind.matches(&io_err));

        let codec_err = CodecError::decoding_failed("bad");
        assert!(!kind.matches(&codec_err));

        let wrapped = crate::CoreError::from(io::Error::other("inner"));
        assert!(!kind.matches(&wrapped));
    }

    #[test]
    fn tolerate_deduplicates() {
        let policy = SkipPolicy::<()>::new()
            .tolerate::<io::Error>()
            .tolerate::<io::Error>()
            .tolerate::<CodecError>();
        assert_eq!(policy.tolerated_kinds().len(), 2);

        let err: Box<dyn Error + Send + Sync> = Box::new(CodecError::decoding_failed("x"));
        assert_eq!(
            policy.tolerated_kind(err.as_ref()),
            Some(FailureKind::of::<CodecError>())
        );
    }
}
