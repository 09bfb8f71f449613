//! Core error types for focusflow-core.
//!
//! The timer engine itself never fails on a tick: side-effect and
//! persistence failures are logged at the call site. The errors here surface
//! from validation (presets, settings) and from the storage layer.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusflow-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

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

    /// The driver task owning the engine has exited.
    #[error("Timer driver is no longer running")]
    DriverStopped,

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
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
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Home/data directory could not be prepared
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors. These are rejected synchronously and leave the
/// timer state untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A preset carried a zero duration.
    #[error("Invalid preset '{name}': {field} must be at least one minute")]
    InvalidPreset { name: String, field: &'static str },

    /// Settings carried a zero duration or a zero long-break interval.
    #[error("Invalid settings: {field} must be positive")]
    InvalidSettings { field: &'static str },

    /// No preset with this name exists in the catalog.
    #[error("Unknown preset: {0}")]
    UnknownPreset(String),
}

/// Failure of a single completion side effect (sound, notification,
/// vibration). Never propagated past the completion sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EffectError {
    /// The host cannot perform this effect at all.
    #[error("{0} is not supported by this host")]
    Unsupported(&'static str),

    /// The effect was attempted and failed.
    #[error("{effect} failed: {message}")]
    Failed {
        effect: &'static str,
        message: String,
    },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(err: toml::de::Error) -> Self {
        CoreError::Config(ConfigError::ParseFailed(err.to_string()))
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_sqlite_maps_to_locked() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            None,
        );
        assert!(matches!(DatabaseError::from(err), DatabaseError::Locked));
    }

    #[test]
    fn invalid_preset_message_names_field() {
        let err = ValidationError::InvalidPreset {
            name: "Broken".into(),
            field: "work",
        };
        assert_eq!(
            err.to_string(),
            "Invalid preset 'Broken': work must be at least one minute"
        );
    }
}
