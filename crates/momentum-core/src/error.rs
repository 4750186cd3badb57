//! Core error types for momentum-core.
//!
//! Mood resolution and character transitions never fail, so only the
//! boundaries (normalization, task edits, persistence, config) appear here.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for momentum-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed or incomplete input; the caller can correct and retry.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The operation referenced a task or session that does not exist.
    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// A collaborator (persistence, plan generation) failed.
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Neither a habit nor a task identifier was present.
    #[error("completion record has no habit or task identifier")]
    MissingIdentifier,

    /// Neither `completed` nor `status` was present.
    #[error("completion record for '{id}' has neither `completed` nor `status`")]
    MissingCompletionState { id: String },

    /// Required text field was empty.
    #[error("'{field}' must not be empty")]
    EmptyField { field: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Lookup failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("task '{0}' does not exist")]
    Task(String),

    /// Session was never created, or its worker has stopped.
    #[error("session '{0}' is not initialized")]
    Session(String),
}

/// Failures of external collaborators, surfaced verbatim.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("database: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("{service} unavailable: {message}")]
    Unavailable { service: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("data directory unavailable: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Collaborator(CollaboratorError::Database(err))
    }
}

impl CoreError {
    /// True for errors the caller can fix by changing its input.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CoreError::Validation(_) | CoreError::NotFound(_))
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
