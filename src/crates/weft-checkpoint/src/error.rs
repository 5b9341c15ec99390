//! Error types for checkpoint store operations

use thiserror::Error;

/// Result type for checkpoint store operations
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Errors that can occur while persisting or querying run state
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// Run not found in the store
    #[error("Run not found: {0}")]
    RunNotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Record is malformed or inconsistent
    #[error("Invalid record: {0}")]
    Invalid(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
