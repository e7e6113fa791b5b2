//! Storage boundary for migrated rows.
//!
//! Every driver error is translated into a [`StorageError`] here; the
//! executor branches on [`StorageErrorKind`] only.

pub mod classify;
pub mod memory;
pub mod mysql;

pub use classify::classify;
pub use memory::MemoryTarget;
pub use mysql::MysqlTarget;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::NewRecord;
use crate::error::Result;

/// How a failed storage operation affects the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// Referenced row missing, or row still referenced. Row-level.
    ForeignKeyViolation,
    /// Unique constraint violated. Row-level.
    UniqueViolation { constraint: String },
    /// Deadlock or lock wait timeout. The whole run is retried.
    Transient,
    /// Anything else. The run is rolled back and fails.
    Fatal,
}

/// A classified storage error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{detail}")]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub detail: String,
}

impl StorageError {
    pub fn new(kind: StorageErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn foreign_key(detail: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::ForeignKeyViolation, detail)
    }

    pub fn unique(constraint: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(
            StorageErrorKind::UniqueViolation {
                constraint: constraint.into(),
            },
            detail,
        )
    }

    pub fn transient(detail: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Transient, detail)
    }

    pub fn fatal(detail: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Fatal, detail)
    }

    /// Whether the error only affects the row being inserted.
    pub fn is_row_level(&self) -> bool {
        matches!(
            self.kind,
            StorageErrorKind::ForeignKeyViolation | StorageErrorKind::UniqueViolation { .. }
        )
    }

    pub fn is_transient(&self) -> bool {
        self.kind == StorageErrorKind::Transient
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// A database the migrated rows are written to.
#[async_trait]
pub trait MigrationTarget: Send + Sync {
    /// Open the single transaction a migration attempt runs in.
    async fn begin(&self) -> StorageResult<Box<dyn TargetTransaction>>;

    /// Test the database connection.
    async fn test_connection(&self) -> Result<()>;

    /// Get the database type.
    fn db_type(&self) -> &str;

    /// Close all connections.
    async fn close(&self);
}

/// An open migration transaction.
#[async_trait]
pub trait TargetTransaction: Send {
    /// Insert one row into `table`.
    async fn insert(&mut self, table: &str, record: &NewRecord) -> StorageResult<()>;

    async fn commit(self: Box<Self>) -> StorageResult<()>;

    async fn rollback(self: Box<Self>) -> StorageResult<()>;
}
