//! Common error types for Echonova

use thiserror::Error;

/// Common result type for Echonova operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Echonova services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stored identifier could not be normalized
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] crate::ident::IdentError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
