//! Legacy rows bound to their column names.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;

use crate::dump::DumpValue;
use crate::transform::coerce;

/// A dump row bound to its column names, as handed to a transform.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyRecord {
    table: String,
    fields: HashMap<String, DumpValue>,
}

impl LegacyRecord {
    pub fn new(table: &str, columns: &[String], values: &[DumpValue]) -> Self {
        let fields = columns
            .iter()
            .cloned()
            .zip(values.iter().cloned())
            .collect();
        Self {
            table: table.to_string(),
            fields,
        }
    }

    /// Build a record from `(column, value)` pairs.
    pub fn from_pairs<'a>(
        table: &str,
        pairs: impl IntoIterator<Item = (&'a str, DumpValue)>,
    ) -> Self {
        Self {
            table: table.to_string(),
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    /// Legacy table this row came from.
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn raw(&self, column: &str) -> Option<&DumpValue> {
        self.fields.get(column)
    }

    /// The legacy primary key, as text.
    pub fn old_id(&self) -> Option<&str> {
        self.non_empty("id")
    }

    /// Text of a non-NULL column.
    pub fn text(&self, column: &str) -> Option<&str> {
        self.raw(column).and_then(DumpValue::as_str)
    }

    /// Trimmed text of a non-NULL, non-blank column.
    pub fn non_empty(&self, column: &str) -> Option<&str> {
        self.text(column).map(str::trim).filter(|s| !s.is_empty())
    }

    /// Owned copy of [`LegacyRecord::non_empty`].
    pub fn string(&self, column: &str) -> Option<String> {
        self.non_empty(column).map(str::to_string)
    }

    pub fn string_or(&self, column: &str, default: &str) -> String {
        self.string(column).unwrap_or_else(|| default.to_string())
    }

    pub fn int(&self, column: &str) -> Option<i64> {
        self.non_empty(column).and_then(coerce::to_i64)
    }

    pub fn int_or(&self, column: &str, default: i64) -> i64 {
        self.int(column).unwrap_or(default)
    }

    pub fn decimal(&self, column: &str) -> Option<Decimal> {
        self.non_empty(column).and_then(coerce::to_decimal)
    }

    pub fn decimal_or(&self, column: &str, default: Decimal) -> Decimal {
        self.decimal(column).unwrap_or(default)
    }

    /// `default` for a NULL or blank column, `None` when the column holds
    /// text that is not a representable decimal.
    pub fn checked_decimal_or(&self, column: &str, default: Decimal) -> Option<Decimal> {
        match self.non_empty(column) {
            Some(s) => coerce::to_decimal(s),
            None => Some(default),
        }
    }

    pub fn bool(&self, column: &str) -> Option<bool> {
        self.non_empty(column).and_then(coerce::to_bool)
    }

    pub fn bool_or(&self, column: &str, default: bool) -> bool {
        self.bool(column).unwrap_or(default)
    }

    pub fn timestamp(&self, column: &str) -> Option<NaiveDateTime> {
        self.non_empty(column).and_then(coerce::parse_timestamp)
    }

    pub fn json(&self, column: &str) -> Option<JsonValue> {
        self.non_empty(column).and_then(coerce::parse_json)
    }
}
