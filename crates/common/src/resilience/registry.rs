//! Named instances of a resilience primitive
//!
//! A registry hands out exactly one instance per name. Instances are created
//! lazily from the registry's default configuration or registered up front
//! with their own.

use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::bulkhead::{Bulkhead, BulkheadConfig};
use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use super::error::{ConfigError, ConfigResult};
use super::events::EventPublisher;
use super::retry::{RetryConfig, RetryExecutor};
use super::time_limiter::{TimeLimiter, TimeLimiterConfig};

/// A primitive that can be built from a name and a configuration
pub trait Registrable: Sized + Send + Sync + 'static {
    type Config: Clone + Send + Sync;

    fn create(name: &str, config: &Self::Config, events: &EventPublisher) -> ConfigResult<Self>;
}

impl Registrable for CircuitBreaker {
    type Config = CircuitBreakerConfig;

    fn create(name: &str, config: &Self::Config, events: &EventPublisher) -> ConfigResult<Self> {
        Ok(CircuitBreaker::new(name, config.clone())?.with_event_publisher(events.clone()))
    }
}

impl Registrable for Bulkhead {
    type Config = BulkheadConfig;

    fn create(name: &str, config: &Self::Config, events: &EventPublisher) -> ConfigResult<Self> {
        Ok(Bulkhead::new(name, config.clone())?.with_event_publisher(events.clone()))
    }
}

impl<P> Registrable for RetryExecutor<P>
where
    P: Default + Send + Sync + 'static,
{
    type Config = RetryConfig;

    fn create(name: &str, config: &Self::Config, events: &EventPublisher) -> ConfigResult<Self> {
        Ok(RetryExecutor::new(name, config.clone(), P::default())?
            .with_event_publisher(events.clone()))
    }
}

impl Registrable for TimeLimiter {
    type Config = TimeLimiterConfig;

    fn create(name: &str, config: &Self::Config, events: &EventPublisher) -> ConfigResult<Self> {
        Ok(TimeLimiter::new(name, config.clone())?.with_event_publisher(events.clone()))
    }
}

/// Name-keyed instances sharing one event publisher
pub struct Registry<T: Registrable> {
    entries: DashMap<String, Arc<T>>,
    default_config: T::Config,
    events: EventPublisher,
}

impl<T: Registrable> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("names", &self.names()).finish()
    }
}

impl<T: Registrable> Registry<T> {
    pub fn new(default_config: T::Config) -> Self {
        Self::with_events(default_config, EventPublisher::new())
    }

    /// Instances created by this registry publish through `events`
    pub fn with_events(default_config: T::Config, events: EventPublisher) -> Self {
        Self { entries: DashMap::new(), default_config, events }
    }

    pub fn events(&self) -> &EventPublisher {
        &self.events
    }

    pub fn default_config(&self) -> &T::Config {
        &self.default_config
    }

    /// Register `name` with its own configuration. Fails if the name is taken.
    pub fn register(&self, name: &str, config: &T::Config) -> ConfigResult<Arc<T>> {
        match self.entries.entry(name.to_string()) {
            Entry::Occupied(_) => Err(ConfigError::Duplicate { name: name.to_string() }),
            Entry::Vacant(slot) => {
                let instance = Arc::new(T::create(name, config, &self.events)?);
                slot.insert(Arc::clone(&instance));
                debug!(name, "registered resilience instance");
                Ok(instance)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.entries.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Existing instance for `name`, or a new one built from the default
    /// configuration. Concurrent callers for the same name get the same
    /// instance.
    pub fn get_or_create(&self, name: &str) -> ConfigResult<Arc<T>> {
        if let Some(existing) = self.get(name) {
            return Ok(existing);
        }
        match self.entries.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(slot) => {
                let instance = Arc::new(T::create(name, &self.default_config, &self.events)?);
                slot.insert(Arc::clone(&instance));
                debug!(name, "created resilience instance from defaults");
                Ok(instance)
            }
        }
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// All instances, sorted by name
    pub fn all(&self) -> Vec<Arc<T>> {
        let mut entries: Vec<(String, Arc<T>)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.into_iter().map(|(_, instance)| instance).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
