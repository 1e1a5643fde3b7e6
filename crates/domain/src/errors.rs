//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Bulwark
///
/// Failures of the guarded operation never reach callers as a
/// `BulwarkError`; they are resolved through fallback. This type covers
/// configuration, lookup and wiring problems around the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum BulwarkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BulwarkError {
    /// Lookup failure for a named resilience resource
    pub fn unknown_resource(kind: &str, name: &str) -> Self {
        Self::NotFound(format!("{kind} '{name}'"))
    }
}

/// Result type alias for Bulwark operations
pub type Result<T> = std::result::Result<T, BulwarkError>;
