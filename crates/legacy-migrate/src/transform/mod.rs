//! Per-table transforms from the legacy schema to the new one.
//!
//! - [`coerce`]: value coercion shared by every table
//! - [`registry`]: the ordered set of transforms the executor walks
//! - [`tables`]: the built-in descriptors, grouped by domain
//!
//! A transform is a function of the legacy row and the identifier map built
//! so far. It returns `None` to skip the row (an unresolved required
//! reference or a missing required field), otherwise the new-schema record,
//! after recording `old id -> new id` for later tables to resolve.

pub mod coerce;
pub mod registry;
pub mod tables;

pub use registry::TransformRegistry;

use tracing::trace;
use uuid::Uuid;

use crate::core::{LegacyRecord, NewRecord};
use crate::remap::IdentifierMap;

/// Transformation of one legacy table into one new-schema table.
pub trait TableTransform: Send + Sync {
    /// Legacy table the rows come from.
    fn old_table(&self) -> &str;

    /// Logical name of the new table; also the identifier map namespace.
    fn new_table(&self) -> &str;

    /// Whether legacy rows may carry an external id that is reused verbatim.
    fn has_stable_id(&self) -> bool;

    /// New logical tables this transform resolves references into.
    fn depends_on(&self) -> &[&str];

    /// Transform one row. `None` means the row is skipped and counted failed.
    fn transform(&self, record: &LegacyRecord, ids: &mut IdentifierMap) -> Option<NewRecord>;
}

/// Row builder for a [`Descriptor`].
pub type TransformFn = fn(&mut RowContext<'_>) -> Option<NewRecord>;

/// Static description of one table mapping.
#[derive(Clone, Copy)]
pub struct Descriptor {
    pub old_table: &'static str,
    pub new_table: &'static str,
    /// Legacy column holding an already-issued external id, if any.
    pub stable_id: Option<&'static str>,
    pub depends_on: &'static [&'static str],
    pub build: TransformFn,
}

impl std::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("old_table", &self.old_table)
            .field("new_table", &self.new_table)
            .field("stable_id", &self.stable_id)
            .field("depends_on", &self.depends_on)
            .finish()
    }
}

impl TableTransform for Descriptor {
    fn old_table(&self) -> &str {
        self.old_table
    }

    fn new_table(&self) -> &str {
        self.new_table
    }

    fn has_stable_id(&self) -> bool {
        self.stable_id.is_some()
    }

    fn depends_on(&self) -> &[&str] {
        self.depends_on
    }

    fn transform(&self, record: &LegacyRecord, ids: &mut IdentifierMap) -> Option<NewRecord> {
        let mut ctx = RowContext {
            record,
            ids,
            new_table: self.new_table,
            stable_id: self.stable_id,
        };
        (self.build)(&mut ctx)
    }
}

/// What a row builder sees: the legacy row and the identifier map.
pub struct RowContext<'a> {
    pub record: &'a LegacyRecord,
    ids: &'a mut IdentifierMap,
    new_table: &'a str,
    stable_id: Option<&'a str>,
}

impl<'a> RowContext<'a> {
    /// Resolve a required reference: `column` holds a legacy id of `table`.
    /// `None` when the column is empty or the target row was never mapped.
    pub fn resolve(&self, table: &str, column: &str) -> Option<String> {
        let resolved = self.resolve_optional(table, column);
        if resolved.is_none() {
            trace!(
                "{}: required {} -> {}_{} is not mapped",
                self.record.table(),
                column,
                table,
                self.record.non_empty(column).unwrap_or("<empty>")
            );
        }
        resolved
    }

    /// Resolve an optional reference; empty or unresolved become NULL.
    pub fn resolve_optional(&self, table: &str, column: &str) -> Option<String> {
        let old = self.record.non_empty(column)?;
        self.ids.get(table, old).map(str::to_string)
    }

    /// Id for the new row, recorded under this table's namespace.
    ///
    /// An already-mapped legacy id keeps its mapping. Otherwise the stable
    /// external id is reused when the table has one and the row carries it,
    /// else a fresh UUID is issued. Call this only once the row is known to
    /// be accepted, so skipped rows leave the map untouched.
    pub fn assign_id(&mut self) -> String {
        let Some(old_id) = self.record.old_id() else {
            return Uuid::new_v4().to_string();
        };
        if let Some(existing) = self.ids.get(self.new_table, old_id) {
            return existing.to_string();
        }
        let new_id = self
            .stable_id
            .and_then(|col| self.record.string(col))
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        self.ids.set(self.new_table, old_id, new_id.clone());
        new_id
    }

    /// Record skeleton with the assigned id and the usual audit timestamps.
    pub fn base(&mut self) -> NewRecord {
        let id = self.assign_id();
        let r = self.record;
        NewRecord::new()
            .field("id", id)
            .field_opt("createdAt", r.timestamp("created_at"))
            .field_opt("updatedAt", r.timestamp("updated_at"))
            .field_opt("deletedAt", r.timestamp("deleted_at"))
    }
}
