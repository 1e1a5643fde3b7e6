//! Infrastructure adapters for the Bulwark resilience engine
//!
//! - [`config`]: loads a [`bulwark_domain::Config`] from the environment or a
//!   TOML/JSON file
//! - [`observability`]: tracing subscriber setup
//! - [`integrations`]: [`bulwark_core::ExternalDataSource`] implementations

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod integrations;
pub mod observability;

pub use integrations::SimulatedExternalService;
