//! Run-scoped set of unique constraints already seen violated.

use std::collections::HashSet;

/// Append-only set of constraint names.
///
/// Re-running against a partially migrated target raises the same duplicate
/// key error for every already-present row; the first occurrence adds the
/// constraint here and later ones are counted without further noise.
#[derive(Debug, Clone, Default)]
pub struct DuplicateBlacklist {
    constraints: HashSet<String>,
}

impl DuplicateBlacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint. Returns `true` the first time it is seen.
    pub fn insert(&mut self, constraint: &str) -> bool {
        self.constraints.insert(constraint.to_string())
    }

    pub fn contains(&self, constraint: &str) -> bool {
        self.constraints.contains(constraint)
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Constraint names in sorted order.
    pub fn sorted(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constraints.iter().cloned().collect();
        names.sort();
        names
    }
}
