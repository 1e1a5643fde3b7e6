//! Testing utilities for code built on the resilience primitives
//!
//! - **[`assertions`]**: assertion macros and float/duration helpers
//! - **[`listeners`]**: an event listener that records what it sees
//! - **[`mocks`]**: scripted operations that fail or succeed on cue
//!
//! ## Usage
//!
//! ```rust
//! use bulwark_common::testing::{RecordingListener, ScriptedOperation};
//!
//! # async fn example() {
//! let operation = ScriptedOperation::<u32, String>::from_pattern("ffs", 7, "Error simulado".into());
//! assert!(operation.call().await.is_err());
//! assert!(operation.call().await.is_err());
//! assert_eq!(operation.call().await, Ok(7));
//! assert_eq!(operation.invocations(), 3);
//! # }
//! ```

pub mod assertions;
pub mod listeners;
pub mod mocks;

pub use assertions::{assert_approx_eq, assert_duration_in_range};
pub use listeners::RecordingListener;
pub use mocks::{ScriptedOperation, Step};

pub use crate::resilience::clock::MockClock;
