//! External data source adapters

pub mod simulated;

pub use simulated::{FailureMode, SimulatedExternalService};
