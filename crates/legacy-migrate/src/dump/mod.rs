//! Legacy SQL dump loading and parsing.
//!
//! - [`loader`]: locate, decompress and decode the dump file
//! - [`parser`]: split the dump into statements and extract the rows of
//!   `INSERT` statements for the tables the registry cares about

pub mod loader;
pub mod parser;

pub use loader::{load_dump, LoadedDump};
pub use parser::{parse_dump, parse_insert, StatementSplitter};

use std::collections::{BTreeMap, HashMap};

use crate::core::LegacyRecord;

/// A single literal from a dump value tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpValue {
    /// The `NULL` literal.
    Null,
    /// Unquoted numeric literal, kept verbatim (`42`, `-1.50`, `1e3`).
    Number(String),
    /// Quoted string with escapes resolved.
    Text(String),
}

impl DumpValue {
    /// Textual content of a non-NULL value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DumpValue::Null => None,
            DumpValue::Number(s) | DumpValue::Text(s) => Some(s),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DumpValue::Null)
    }
}

/// Rows extracted from one `INSERT INTO ... VALUES (...),(...);` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDumpStatement {
    pub table: String,
    /// Explicit column list, if the statement carried one.
    pub columns: Option<Vec<String>>,
    pub rows: Vec<Vec<DumpValue>>,
}

/// All rows of one legacy table, aligned to a single column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DumpTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<DumpValue>>,
}

impl DumpTable {
    /// Append rows whose values follow `columns`. Rows are realigned when the
    /// column order differs from what this table already holds.
    pub fn append(&mut self, columns: &[String], rows: Vec<Vec<DumpValue>>) {
        if self.columns.is_empty() && self.rows.is_empty() {
            self.columns = columns.to_vec();
            self.rows = rows;
            return;
        }
        if self.columns == columns {
            self.rows.extend(rows);
            return;
        }

        for col in columns {
            if !self.columns.contains(col) {
                self.columns.push(col.clone());
                for row in &mut self.rows {
                    row.push(DumpValue::Null);
                }
            }
        }

        let positions: Vec<usize> = columns
            .iter()
            .filter_map(|c| self.columns.iter().position(|own| own == c))
            .collect();

        for row in rows {
            let mut aligned = vec![DumpValue::Null; self.columns.len()];
            for (value, &pos) in row.into_iter().zip(positions.iter()) {
                aligned[pos] = value;
            }
            self.rows.push(aligned);
        }
    }

    /// Bind every row to its column names.
    pub fn records<'a>(&'a self, table: &'a str) -> impl Iterator<Item = LegacyRecord> + 'a {
        self.rows
            .iter()
            .map(move |row| LegacyRecord::new(table, &self.columns, row))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A statement the parser gave up on.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedStatement {
    pub table: Option<String>,
    pub reason: String,
}

/// Parse result: `table -> {columns, rows}` restricted to the requested tables.
#[derive(Debug, Clone, Default)]
pub struct ParsedDump {
    pub tables: HashMap<String, DumpTable>,
    /// Statements encountered, of any kind.
    pub statements_seen: usize,
    /// INSERT statements that contributed rows.
    pub inserts_parsed: usize,
    /// Malformed statements that were skipped.
    pub skipped: Vec<SkippedStatement>,
}

impl ParsedDump {
    pub fn table(&self, name: &str) -> Option<&DumpTable> {
        self.tables.get(name)
    }

    /// Total rows across all extracted tables.
    pub fn row_count(&self) -> usize {
        self.tables.values().map(DumpTable::len).sum()
    }

    /// Row count per table, sorted by table name.
    pub fn table_counts(&self) -> BTreeMap<&str, usize> {
        self.tables
            .iter()
            .map(|(name, t)| (name.as_str(), t.len()))
            .collect()
    }
}
