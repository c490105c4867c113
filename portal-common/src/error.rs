//! Common error types for the speaker portal

use thiserror::Error;

/// Common result type for portal operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the portal crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored JSON column could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The external datastore rejected or failed a request
    #[error("External datastore error: {0}")]
    External(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
