//! Ordered transform registry.

use std::collections::HashSet;

use crate::error::{MigrateError, Result};

use super::{tables, TableTransform};

/// Transforms in execution order. Every table a transform depends on is
/// registered before it.
pub struct TransformRegistry {
    transforms: Vec<Box<dyn TableTransform>>,
}

impl TransformRegistry {
    /// Build a registry, rejecting orders where a dependency is not
    /// registered earlier or a new table is registered twice.
    pub fn new(transforms: Vec<Box<dyn TableTransform>>) -> Result<Self> {
        check_order(&transforms)?;
        Ok(Self { transforms })
    }

    /// The built-in legacy schema mappings.
    pub fn builtin() -> Self {
        Self {
            transforms: tables::all(),
        }
    }

    /// Legacy tables worth extracting from the dump.
    pub fn required_tables(&self) -> HashSet<&str> {
        self.transforms.iter().map(|t| t.old_table()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn TableTransform> {
        self.transforms.iter().map(|t| t.as_ref())
    }

    /// Look up the transform for a legacy table.
    pub fn get(&self, old_table: &str) -> Option<&dyn TableTransform> {
        self.iter().find(|t| t.old_table() == old_table)
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn check_order(transforms: &[Box<dyn TableTransform>]) -> Result<()> {
    let mut registered: HashSet<&str> = HashSet::new();
    for t in transforms {
        for dep in t.depends_on() {
            // Self references (parent rows) resolve against rows already
            // processed in the same table.
            if *dep != t.new_table() && !registered.contains(dep) {
                return Err(MigrateError::Config(format!(
                    "transform for '{}' depends on '{}', which is not registered before it",
                    t.old_table(),
                    dep
                )));
            }
        }
        if !registered.insert(t.new_table()) {
            return Err(MigrateError::Config(format!(
                "table '{}' is registered twice",
                t.new_table()
            )));
        }
    }
    Ok(())
}
