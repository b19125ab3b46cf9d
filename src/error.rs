//! Error types for the ratewarden crate.

use thiserror::Error;

/// Main error type for ratewarden operations.
///
/// Over-limit is not an error: rate limit decisions are ordinary return
/// values. This type covers setup and infrastructure failures only.
#[derive(Error, Debug)]
pub enum WardenError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persistent store unreachable or corrupted
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ratewarden operations.
pub type Result<T> = std::result::Result<T, WardenError>;
