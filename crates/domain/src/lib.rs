//! # Bulwark Domain
//!
//! Plain data shared by every Bulwark crate.
//!
//! This crate contains:
//! - Deployment configuration (`Config` and its per-resource settings)
//! - Domain error types and Result definitions
//! - Resolution metadata returned by guarded calls
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other Bulwark crates
//! - Only external dependencies allowed
//! - Durations are stored as integer milliseconds and converted at the edge

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
