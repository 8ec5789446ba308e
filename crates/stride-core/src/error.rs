//! Core error types for stride-core.
//!
//! Each concern owns a thiserror enum; [`CoreError`] aggregates them for
//! callers (the CLI, mostly) that do not care which layer failed.

use std::path::PathBuf;
use thiserror::Error;

use crate::session::RunState;

/// Core error type for stride-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Run lifecycle errors
    #[error("Tracking error: {0}")]
    Tracking(#[from] TrackingError),

    /// Key-value storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lifecycle action names, used in [`TrackingError::InvalidTransition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Pause,
    Resume,
    Finish,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Action::Start => "start",
            Action::Pause => "pause",
            Action::Resume => "resume",
            Action::Finish => "finish",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the run lifecycle.
#[derive(Error, Debug)]
pub enum TrackingError {
    /// Location permission has not been granted.
    #[error("Location permission denied")]
    PermissionDenied,

    /// The platform cannot produce location samples.
    #[error("Location source unavailable: {0}")]
    SourceUnavailable(String),

    /// The requested action is not valid in the current state. No state changed.
    #[error("Cannot {action} a run while {state}")]
    InvalidTransition { action: Action, state: RunState },

    /// The finished run could not be appended to history.
    /// The controller has already reset; the run is not retained.
    #[error("Failed to persist run {run_id}: {source}")]
    Persistence {
        run_id: String,
        #[source]
        source: StorageError,
    },

    /// The tracker task is no longer running.
    #[error("Run tracker has shut down")]
    TrackerClosed,
}

impl TrackingError {
    /// True for the non-fatal, no-op lifecycle rejection.
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, TrackingError::InvalidTransition { .. })
    }
}

/// Key-value storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// Stored value could not be (de)serialized
    #[error("Malformed stored value: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Data directory could not be resolved or created
    #[error("Failed to access data directory: {0}")]
    DataDir(#[from] std::io::Error),

    /// No run with the given id exists in history
    #[error("Run '{0}' not found")]
    RunNotFound(String),

    /// Store lock was poisoned by a panicking writer
    #[error("Storage lock poisoned")]
    Poisoned,
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

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Data directory could not be resolved or created
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    /// Latitude outside [-90, 90]
    #[error("Latitude {0} out of range [-90, 90]")]
    LatitudeOutOfRange(f64),

    /// Longitude outside [-180, 180]
    #[error("Longitude {0} out of range [-180, 180]")]
    LongitudeOutOfRange(f64),

    /// NaN or infinite value
    #[error("Non-finite value for '{0}'")]
    NonFinite(&'static str),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_message_names_action_and_state() {
        let err = TrackingError::InvalidTransition {
            action: Action::Pause,
            state: RunState::Idle,
        };
        assert_eq!(err.to_string(), "Cannot pause a run while idle");
        assert!(err.is_invalid_transition());
        assert!(!TrackingError::PermissionDenied.is_invalid_transition());
    }

    #[test]
    fn storage_error_converts_into_core_error() {
        let err: CoreError = StorageError::RunNotFound("abc".into()).into();
        assert!(matches!(err, CoreError::Storage(StorageError::RunNotFound(_))));
    }
}
