//! Error types for JobTrack.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, JobTrackError>;

#[derive(Debug, Error)]
pub enum JobTrackError {
    /// A required field is missing or malformed.
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// The record does not exist or belongs to another user.
    /// Both cases share one variant so a foreign id looks like a missing one.
    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl JobTrackError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
