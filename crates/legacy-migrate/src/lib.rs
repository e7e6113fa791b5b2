//! # legacy-migrate
//!
//! Migration of a legacy platform MySQL dump into the new schema.
//!
//! The dump is parsed once, then every legacy table is transformed in
//! dependency order and inserted row by row inside a single transaction:
//!
//! - **Dump parsing** of plain or gzip-compressed `mysqldump` output
//! - **Identifier remapping** so later tables resolve references into
//!   earlier ones, reusing already-issued external ids
//! - **Row-level fault tolerance**: unresolved references and foreign key
//!   violations are counted as failed, duplicate keys are blacklisted
//! - **Whole-run retry** when the transaction hits a deadlock
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use legacy_migrate::{Config, MigrationExecutor, MysqlTarget};
//!
//! #[tokio::main]
//! async fn main() -> legacy_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let target = MysqlTarget::new(&config.target).await?;
//!     let executor = MigrationExecutor::new(config, Arc::new(target));
//!     let result = executor.run().await?;
//!     for table in &result.tables {
//!         println!("{}", table.summary_line());
//!     }
//!     Ok(())
//! }
//! ```

pub mod blacklist;
pub mod config;
pub mod core;
pub mod dump;
pub mod error;
pub mod orchestrator;
pub mod remap;
pub mod target;
pub mod transform;

// Re-exports for convenient access
pub use blacklist::DuplicateBlacklist;
pub use config::{Config, DumpConfig, MigrationConfig, TargetConfig};
pub use crate::core::{LegacyRecord, NewRecord, SqlValue};
pub use dump::{load_dump, parse_dump, DumpTable, DumpValue, LoadedDump, ParsedDump};
pub use error::{MigrateError, Result};
pub use orchestrator::{
    MigrationExecutor, MigrationResult, ProgressEvent, RunPhase, TableStats,
};
pub use remap::IdentifierMap;
pub use target::{
    MemoryTarget, MigrationTarget, MysqlTarget, StorageError, StorageErrorKind, TargetTransaction,
};
pub use transform::{Descriptor, RowContext, TableTransform, TransformRegistry};
