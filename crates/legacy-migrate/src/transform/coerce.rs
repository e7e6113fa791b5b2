//! Value coercion from legacy dump text to new-schema types.
//!
//! Defaults are the caller's business; every function here returns `None`
//! when the input cannot be interpreted.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use std::str::FromStr;

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parse a legacy timestamp.
///
/// Accepts MySQL `DATETIME` text (with or without fraction), RFC 3339 with
/// an offset (normalized to UTC), and bare dates (midnight). MySQL zero
/// dates yield `None`.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() || s.starts_with("0000-00-00") {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    let bare = s.strip_suffix('Z').unwrap_or(s);
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(bare, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(bare, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse an embedded JSON column.
///
/// Legacy rows store JSON as text that is sometimes double-encoded (a JSON
/// string whose content is JSON) or still carries escaped quotes. Both are
/// unwrapped; the result is a structured value ready to be re-serialized.
pub fn parse_json(s: &str) -> Option<JsonValue> {
    let mut current = s.trim().to_string();
    for _ in 0..3 {
        match serde_json::from_str::<JsonValue>(&current) {
            Ok(JsonValue::String(inner)) if looks_like_json(&inner) => current = inner,
            Ok(value) => return Some(value),
            Err(_) if current.contains("\\\"") => {
                current = current.replace("\\\\", "\\").replace("\\\"", "\"");
            }
            Err(_) => return None,
        }
    }
    serde_json::from_str(&current).ok()
}

fn looks_like_json(s: &str) -> bool {
    let s = s.trim();
    (s.starts_with('{') && s.ends_with('}')) || (s.starts_with('[') && s.ends_with(']'))
}

/// Interpret a legacy flag column.
pub fn to_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" | "active" | "enabled" => Some(true),
        "0" | "false" | "no" | "n" | "off" | "inactive" | "disabled" => Some(false),
        other => other
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(|n| n != 0.0),
    }
}

/// Integer coercion; decimals are truncated toward zero.
pub fn to_i64(s: &str) -> Option<i64> {
    let s = s.trim();
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
}

/// Exact decimal coercion, accepting scientific notation.
pub fn to_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    Decimal::from_str(s)
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}

/// URL slug: lowercase ASCII alphanumerics separated by single dashes.
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    let mut dash = false;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            dash = false;
        } else if !slug.is_empty() && !dash {
            slug.push('-');
            dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
