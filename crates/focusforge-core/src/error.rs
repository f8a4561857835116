//! Core error types for focusforge-core.
//!
//! This module defines the error hierarchy using thiserror. The three
//! scheduling failures (persistence, invalid action, unavailable policy) are
//! all recoverable at the call site; none of them is meant to abort the
//! process.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusforge-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session store errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// A policy or the codec produced/received an out-of-domain action
    #[error("Invalid action: {0}")]
    InvalidAction(#[from] InvalidActionError),

    /// No usable policy is configured
    #[error("Policy unavailable: {0}")]
    PolicyUnavailable(#[from] PolicyUnavailableError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A training run was aborted between steps
    #[error("Training run cancelled after {steps} steps")]
    Cancelled { steps: u64 },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Session store errors.
///
/// When one of these is returned the session log and every analytic derived
/// from it are unchanged.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A previous writer panicked while holding the store lock
    #[error("Session store lock poisoned")]
    Poisoned,

    /// The data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Out-of-domain action errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidActionError {
    /// Action identifier outside `0..=8`
    #[error("action {action} is outside the action space 0..=8")]
    OutOfRange { action: i64 },

    /// Delta pair not drawn from {-5, 0, 5}
    #[error("deltas ({work_delta}, {break_delta}) are not in {{-5, 0, 5}}")]
    InvalidDelta { work_delta: i32, break_delta: i32 },
}

/// Errors raised when no policy can produce an action.
#[derive(Error, Debug)]
pub enum PolicyUnavailableError {
    /// Neither a model nor a rule table is configured
    #[error("no trained model loaded and no rule table configured")]
    NoPolicyConfigured,

    /// Model-driven mode was required but no artifact is loaded
    #[error("model-driven mode requires a trained policy artifact at {}", path.display())]
    ModelMissing { path: PathBuf },

    /// The artifact exists but could not be read
    #[error("failed to load policy artifact from {path}: {message}")]
    ModelLoadFailed { path: PathBuf, message: String },
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
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg)
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                PersistenceError::Locked
            }
            _ => PersistenceError::QueryFailed(err.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for PersistenceError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        PersistenceError::Poisoned
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
