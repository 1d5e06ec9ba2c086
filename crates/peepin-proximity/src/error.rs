//! Error types for proximity operations.

use thiserror::Error;

/// Result type for proximity operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while storing or resolving locations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Caller supplied missing or unusable input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A user profile could not be resolved
    #[error("Not found: {0}")]
    NotFound(String),

    /// Policy values are out of range
    #[error("Invalid policy: {0}")]
    Policy(String),
}
