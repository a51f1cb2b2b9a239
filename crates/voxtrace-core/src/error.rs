//! Error types for world setup and persistence.
//!
//! Traversal itself never fails; these cover building and loading the
//! data it runs over.

use thiserror::Error;

/// Engine-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid data error
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Out of bounds access
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
