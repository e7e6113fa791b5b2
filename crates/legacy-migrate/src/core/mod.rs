//! Row representations shared by the dump parser, transforms and targets.
//!
//! - [`record`]: legacy rows bound to their column names
//! - [`value`]: new-schema values and records

pub mod record;
pub mod value;

pub use record::LegacyRecord;
pub use value::{NewRecord, SqlValue};
