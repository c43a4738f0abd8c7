//! Error types for the bulkops crate.

use std::time::Duration;

use thiserror::Error;

/// Error types for bulk operations and their compensation
#[derive(Error, Debug, Clone)]
pub enum BulkOpsError {
    // Compensation errors
    #[error("Operation '{id}' not found in history")]
    NotFound { id: String },

    #[error("Operation '{id}' cannot be undone")]
    NotUndoable { id: String },

    #[error("Operation '{id}' is already being undone")]
    UndoInProgress { id: String },

    #[error("Invalid snapshot for '{op_type}': {reason}")]
    InvalidSnapshot { op_type: String, reason: String },

    #[error("Undo of '{id}' failed: {reason}")]
    UndoFailed { id: String, reason: String },

    #[error("Unknown operation type: '{label}'")]
    InvalidOperationType { label: String },

    // Storage errors
    #[error("{collection} '{id}' not found")]
    EntityNotFound { collection: String, id: String },

    #[error("Storage error: {reason}")]
    Storage { reason: String },

    #[error("Failed to read file '{path}': {reason}")]
    FileRead { path: String, reason: String },

    #[error("Failed to write file '{path}': {reason}")]
    FileWrite { path: String, reason: String },

    #[error("Failed to parse JSON: {reason}")]
    JsonParse { reason: String },

    #[error("'{operation}' timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    // Configuration errors
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidConfigValue { key: String, reason: String },

    // General errors
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },
}

impl From<std::io::Error> for BulkOpsError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BulkOpsError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonParse {
            reason: err.to_string(),
        }
    }
}

/// Result type alias for bulkops operations
pub type BulkOpsResult<T> = Result<T, BulkOpsError>;
