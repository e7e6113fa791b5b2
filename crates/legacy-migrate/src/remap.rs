//! Run-scoped legacy id to new id dictionary.

use std::collections::HashMap;

/// Flat `"<table>_<oldId>" -> newId` map for one migration attempt.
///
/// Entries are write-once: a second `set` for the same key keeps the first
/// value, so repeated lookups within a run always agree.
#[derive(Debug, Clone, Default)]
pub struct IdentifierMap {
    entries: HashMap<String, String>,
}

impl IdentifierMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compose the lookup key for a logical table and legacy id.
    pub fn key(table: &str, old_id: &str) -> String {
        format!("{}_{}", table, old_id)
    }

    /// Resolve a legacy id to its new id.
    pub fn get(&self, table: &str, old_id: &str) -> Option<&str> {
        self.entries
            .get(&Self::key(table, old_id))
            .map(String::as_str)
    }

    /// Record a mapping. Returns `false` (and keeps the existing value) when
    /// the key was already mapped.
    pub fn set(&mut self, table: &str, old_id: &str, new_id: impl Into<String>) -> bool {
        use std::collections::hash_map::Entry;
        match self.entries.entry(Self::key(table, old_id)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(new_id.into());
                true
            }
        }
    }

    pub fn contains(&self, table: &str, old_id: &str) -> bool {
        self.entries.contains_key(&Self::key(table, old_id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
