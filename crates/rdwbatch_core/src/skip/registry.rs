//! Identifier registries used to build a policy from configuration.
//!
//! Configuration names observers and tolerable failure kinds by string.
//! The registries map those strings to factories and kinds that the
//! application registered up front.

use crate::config::options;
use crate::error::{CoreError, CoreResult};
use crate::skip::observer::{LogObserver, SkipObserver};
use crate::skip::policy::FailureKind;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

type ObserverFactory<R> = Box<dyn Fn() -> Box<dyn SkipObserver<R> + Send> + Send + Sync>;

/// Observer factories by identifier.
pub struct ObserverRegistry<R> {
    factories: BTreeMap<String, ObserverFactory<R>>,
}

impl<R> Default for ObserverRegistry<R> {
    fn default() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }
}

impl<R> ObserverRegistry<R> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under `id`, replacing any previous one.
    pub fn register<O, F>(&mut self, id: impl Into<String>, factory: F)
    where
        O: SkipObserver<R> + Send + 'static,
        F: Fn() -> O + Send + Sync + 'static,
    {
        self.factories
            .insert(id.into(), Box::new(move || Box::new(factory())));
    }

    /// Returns true if `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered identifiers in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Creates a fresh observer for `id`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming `SKIP_RECORD_OBSERVER` if `id`
    /// is unknown.
    pub fn create(&self, id: &str) -> CoreResult<Box<dyn SkipObserver<R> + Send>> {
        self.factories.get(id).map(|factory| factory()).ok_or_else(|| {
            CoreError::configuration(
                options::SKIP_RECORD_OBSERVER,
                format!("unknown skip observer '{id}'"),
            )
        })
    }
}

impl<R: fmt::Debug> ObserverRegistry<R> {
    /// A registry holding the built-in `log` observer.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("log", || LogObserver);
        registry
    }
}

impl<R> fmt::Debug for ObserverRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

/// Tolerable failure kinds by identifier.
#[derive(Debug, Clone, Default)]
pub struct FailureKindRegistry {
    kinds: BTreeMap<String, FailureKind>,
}

impl FailureKindRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the error types of this workspace:
    /// `io`, `storage`, `codec`, and `core`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register::<std::io::Error>("io");
        registry.register::<rdwbatch_storage::StorageError>("storage");
        registry.register::<rdwbatch_codec::CodecError>("codec");
        registry.register::<CoreError>("core");
        registry
    }

    /// Registers error type `E` under `id`.
    pub fn register<E: Error + 'static>(&mut self, id: impl Into<String>) {
        self.kinds.insert(id.into(), FailureKind::of::<E>());
    }

    /// Looks up `id`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming `SKIP_EXCEPTION` if `id` is
    /// unknown.
    pub fn get(&self, id: &str) -> CoreResult<FailureKind> {
        self.kinds.get(id).copied().ok_or_else(|| {
            CoreError::configuration(
                options::SKIP_EXCEPTION,
                format!("unknown failure kind '{id}'"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SkipConfig;
    use crate::skip::{Limit, SkipPolicy};

    #[test]
    fn unknown_identifiers_are_configuration_errors() {
        let observers = ObserverRegistry::<u32>::with_builtins();
        assert!(observers.contains("log"));
        assert!(observers.create("email").err().unwrap().is_configuration());

        let kinds = FailureKindRegistry::with_builtins();
        assert!(kinds.get("sql").unwrap_err().is_configuration());
        assert_eq!(kinds.get("io").unwrap(), FailureKind::of::<std::io::Error>());
    }

    #[test]
    fn policy_from_config() {
        let mut observers = ObserverRegistry::<u32>::with_builtins();
        observers.register("noop", || {
            |_: &u32, _: &crate::skip::SkipStatus<'_>| -> Result<(), crate::skip::BoxError> { Ok(()) }
        });

        let config = SkipConfig::new()
            .max_skip_records(Limit::AtMost(4))
            .observer("log")
            .observer("noop")
            .tolerate("codec");

        let policy =
            SkipPolicy::from_config(&config, &observers, &FailureKindRegistry::with_builtins()).unwrap();
        assert_eq!(policy.skip_limit(), Limit::AtMost(4));
        assert_eq!(policy.tolerated_limit(), Limit::Unlimited);
        assert_eq!(policy.observer_count(), 2);
        assert_eq!(policy.tolerated_kinds().len(), 1);

        let config = SkipConfig::new().observer("missing");
        assert!(
            SkipPolicy::from_config(&config, &observers, &FailureKindRegistry::new()).is_err()
        );
    }
}
