//! Per-table counters.

use serde::{Deserialize, Serialize};

/// Outcome counters for one legacy table.
///
/// Every row lands in exactly one bucket, so
/// `inserted + failed + blacklisted == total` once the table is processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub table: String,
    pub total: usize,
    pub inserted: usize,
    pub failed: usize,
    pub blacklisted: usize,
}

impl TableStats {
    pub fn new(table: &str, total: usize) -> Self {
        Self {
            table: table.to_string(),
            total,
            ..Default::default()
        }
    }

    /// Rows that have an outcome so far.
    pub fn processed(&self) -> usize {
        self.inserted + self.failed + self.blacklisted
    }

    /// `"<table>: Total: n, Inserted: n, Failed: n, Blacklisted: n"`.
    pub fn summary_line(&self) -> String {
        format!(
            "{}: Total: {}, Inserted: {}, Failed: {}, Blacklisted: {}",
            self.table, self.total, self.inserted, self.failed, self.blacklisted
        )
    }
}
