//! SQL value types for new-schema rows.
//!
//! Transforms produce [`NewRecord`]s made of [`SqlValue`]s; the storage
//! boundary binds them as statement parameters.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;

/// SQL value enum for type-safe row handling.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL.
    Null,

    /// Boolean value (TINYINT(1) on MySQL).
    Bool(bool),

    /// 64-bit signed integer.
    I64(i64),

    /// Double precision float.
    F64(f64),

    /// Exact decimal, used for balances, prices and fees.
    Decimal(Decimal),

    /// Text data.
    Text(String),

    /// JSON document, serialized when bound.
    Json(JsonValue),

    /// Timestamp without timezone (UTC by convention).
    DateTime(NaiveDateTime),

    /// Date without time component.
    Date(NaiveDate),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Borrow the text content, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I64(i64::from(v))
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<JsonValue> for SqlValue {
    fn from(v: JsonValue) -> Self {
        SqlValue::Json(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// A row in the new schema: ordered `(camelCase column, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewRecord {
    fields: Vec<(String, SqlValue)>,
}

impl NewRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, replacing an earlier value for the same column.
    #[must_use]
    pub fn field(mut self, name: &str, value: impl Into<SqlValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a column only when a value is present. Absent columns are left
    /// out of the INSERT so the target's column default applies.
    #[must_use]
    pub fn field_opt<T: Into<SqlValue>>(self, name: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.field(name, v),
            None => self,
        }
    }

    /// Set a column in place.
    pub fn set(&mut self, name: &str, value: impl Into<SqlValue>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// Get a column value.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// The record's `id` column as text, if set.
    pub fn id(&self) -> Option<&str> {
        self.get("id").and_then(SqlValue::as_text)
    }

    /// Column names in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Values in column order.
    pub fn values(&self) -> impl Iterator<Item = &SqlValue> {
        self.fields.iter().map(|(_, v)| v)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
