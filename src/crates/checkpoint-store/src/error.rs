//! Error types for checkpoint operations

use thiserror::Error;

/// Result type for checkpoint operations
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Errors that can occur during checkpoint operations
///
/// Absence is never an error: `get_tuple` returns `Ok(None)` and `list`
/// yields an empty sequence when nothing matches.
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Store configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Invalid checkpoint or config
    #[error("Invalid checkpoint: {0}")]
    Invalid(String),

    /// A checkpoint id already exists in the thread with different content
    #[error("Checkpoint {checkpoint_id} already exists in thread {thread_id} with different content")]
    IdentityConflict {
        thread_id: String,
        checkpoint_id: String,
    },

    /// Metadata filter cannot be compared against stored metadata
    #[error("Invalid metadata filter: {0}")]
    InvalidFilter(String),

    /// Parent lineage cannot be advanced
    #[error("Lineage error: {0}")]
    Lineage(String),
}

impl CheckpointError {
    /// Returns true for the conflict raised by a colliding checkpoint id
    pub fn is_identity_conflict(&self) -> bool {
        matches!(self, CheckpointError::IdentityConflict { .. })
    }
}
