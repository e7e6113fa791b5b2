//! Error types for the migration library.

use thiserror::Error;

use crate::target::StorageError;

/// Main error type for migration operations.
///
/// Row-level problems (unresolved references, duplicate keys) never surface
/// here; they are tallied per table and the run continues.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing connection params, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dump file could not be read or decoded
    #[error("Dump error: {0}")]
    Dump(String),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Transaction-fatal storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Lock contention persisted across every allowed attempt
    #[error("Migration failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl std::fmt::Display, context: impl Into<String>) -> Self {
        MigrateError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Process exit code for this error kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => 2,
            MigrateError::Dump(_) | MigrateError::Io(_) => 3,
            MigrateError::Pool { .. } | MigrateError::Storage(_) => 4,
            MigrateError::RetriesExhausted { .. } => 5,
            MigrateError::Json(_) => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
