//! In-memory migration target for dry runs and tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use super::{MigrationTarget, StorageError, StorageResult, TargetTransaction};
use crate::core::NewRecord;
use crate::error::Result;

#[derive(Debug, Default)]
struct Tables {
    rows: BTreeMap<String, Vec<NewRecord>>,
}

impl Tables {
    fn has_id(&self, table: &str, id: &str) -> bool {
        self.rows
            .get(table)
            .is_some_and(|rows| rows.iter().any(|r| r.id() == Some(id)))
    }
}

/// Keeps committed rows per table. Duplicate `id`s are rejected as a
/// `PRIMARY` unique violation; rows become visible on commit.
#[derive(Debug, Clone, Default)]
pub struct MemoryTarget {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Committed rows of a table.
    pub fn rows(&self, table: &str) -> Vec<NewRecord> {
        self.lock().rows.get(table).cloned().unwrap_or_default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.lock().rows.get(table).map_or(0, Vec::len)
    }

    /// Committed rows across all tables.
    pub fn total_rows(&self) -> usize {
        self.lock().rows.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl MigrationTarget for MemoryTarget {
    async fn begin(&self) -> StorageResult<Box<dyn TargetTransaction>> {
        Ok(Box::new(MemoryTransaction {
            target: self.clone(),
            pending: Vec::new(),
            pending_ids: HashSet::new(),
        }))
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    fn db_type(&self) -> &str {
        "memory"
    }

    async fn close(&self) {}
}

struct MemoryTransaction {
    target: MemoryTarget,
    pending: Vec<(String, NewRecord)>,
    pending_ids: HashSet<(String, String)>,
}

#[async_trait]
impl TargetTransaction for MemoryTransaction {
    async fn insert(&mut self, table: &str, record: &NewRecord) -> StorageResult<()> {
        if let Some(id) = record.id() {
            let key = (table.to_string(), id.to_string());
            if self.pending_ids.contains(&key) || self.target.lock().has_id(table, id) {
                return Err(StorageError::unique(
                    "PRIMARY",
                    format!("Duplicate entry '{}' for key 'PRIMARY'", id),
                ));
            }
            self.pending_ids.insert(key);
        }
        self.pending.push((table.to_string(), record.clone()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        let MemoryTransaction {
            target, pending, ..
        } = *self;
        let count = pending.len();
        let mut tables = target.lock();
        for (table, record) in pending {
            tables.rows.entry(table).or_default().push(record);
        }
        debug!("Committed {} rows to memory target", count);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StorageResult<()> {
        debug!("Discarded {} uncommitted rows", self.pending.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::StorageErrorKind;

    fn row(id: &str) -> NewRecord {
        NewRecord::new().field("id", id)
    }

    #[tokio::test]
    async fn test_rows_visible_after_commit() {
        let target = MemoryTarget::new();
        let mut tx = target.begin().await.unwrap();
        tx.insert("user", &row("a")).await.unwrap();
        assert_eq!(target.row_count("user"), 0);
        tx.commit().await.unwrap();
        assert_eq!(target.row_count("user"), 1);
        assert_eq!(target.rows("user")[0].id(), Some("a"));
    }

    #[tokio::test]
    async fn test_rollback_discards() {
        let target = MemoryTarget::new();
        let mut tx = target.begin().await.unwrap();
        tx.insert("user", &row("a")).await.unwrap();
        tx.rollback().await.unwrap();
        assert_eq!(target.total_rows(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_primary_violation() {
        let target = MemoryTarget::new();
        let mut tx = target.begin().await.unwrap();
        tx.insert("user", &row("a")).await.unwrap();
        tx.insert("wallet", &row("a")).await.unwrap();
        let err = tx.insert("user", &row("a")).await.unwrap_err();
        assert_eq!(
            err.kind,
            StorageErrorKind::UniqueViolation {
                constraint: "PRIMARY".into()
            }
        );
        tx.commit().await.unwrap();

        let mut tx = target.begin().await.unwrap();
        assert!(tx.insert("user", &row("a")).await.is_err());
    }
}
