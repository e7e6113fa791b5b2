//! Translation of MySQL server errors into [`StorageError`] kinds.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{StorageError, StorageErrorKind};

const ER_DUP_ENTRY: u16 = 1062;
const ER_DUP_ENTRY_WITH_KEY_NAME: u16 = 1586;
const ER_ROW_IS_REFERENCED: u16 = 1217;
const ER_NO_REFERENCED_ROW: u16 = 1216;
const ER_ROW_IS_REFERENCED_2: u16 = 1451;
const ER_NO_REFERENCED_ROW_2: u16 = 1452;
const ER_LOCK_WAIT_TIMEOUT: u16 = 1205;
const ER_LOCK_DEADLOCK: u16 = 1213;

static DUPLICATE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"for key '([^']+)'").expect("valid regex"));

/// Classify a storage error from its server code (if any) and message.
///
/// Codes decide when present; the message patterns cover drivers and
/// proxies that only surface text.
pub fn classify(code: Option<u16>, message: &str) -> StorageError {
    let kind = match code {
        Some(ER_ROW_IS_REFERENCED | ER_NO_REFERENCED_ROW)
        | Some(ER_ROW_IS_REFERENCED_2 | ER_NO_REFERENCED_ROW_2) => {
            StorageErrorKind::ForeignKeyViolation
        }
        Some(ER_DUP_ENTRY | ER_DUP_ENTRY_WITH_KEY_NAME) => unique(message),
        Some(ER_LOCK_DEADLOCK | ER_LOCK_WAIT_TIMEOUT) => StorageErrorKind::Transient,
        _ => from_message(message),
    };
    StorageError::new(kind, message)
}

fn from_message(message: &str) -> StorageErrorKind {
    let lower = message.to_ascii_lowercase();
    if lower.contains("foreign key constraint fails") {
        StorageErrorKind::ForeignKeyViolation
    } else if lower.contains("duplicate entry") {
        unique(message)
    } else if lower.contains("deadlock found") || lower.contains("lock wait timeout") {
        StorageErrorKind::Transient
    } else {
        StorageErrorKind::Fatal
    }
}

/// The violated key name; the whole message when the key cannot be found.
fn unique(message: &str) -> StorageErrorKind {
    let constraint = DUPLICATE_KEY
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| message.to_string());
    StorageErrorKind::UniqueViolation { constraint }
}
