//! # Bulwark Core
//!
//! The resilience engine: fallback resolution, the decorator composer and
//! the registry that wires primitives to configuration.
//!
//! This crate contains:
//! - [`FallbackResolver`]: cached value first, static default second
//! - [`Guard`]: Bulkhead -> CircuitBreaker -> Retry -> operation, total
//! - [`ResilienceRegistry`]: one instance per resource name, from `Config`
//! - [`AdminService`]: breaker status and reset
//! - Port interfaces for the protected dependency
//!
//! ## Architecture Principles
//! - Only depends on `bulwark-common` and `bulwark-domain`
//! - No network, file or platform code
//! - External dependencies via traits

pub mod admin;
pub mod fallback;
pub mod guard;
pub mod ports;
pub mod registry;
pub mod service;

pub use admin::AdminService;
pub use fallback::{CacheEntry, FallbackCache, FallbackResolver};
pub use guard::{guarded_call, AttemptFailure, Guard, GuardBuilder};
pub use ports::{ExternalDataSource, SourceError};
pub use registry::ResilienceRegistry;
pub use service::GuardedDataService;
