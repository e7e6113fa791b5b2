//! Built-in descriptors for the legacy platform schema.
//!
//! Order matters: every table listed in a descriptor's `depends_on` is
//! registered before it, which [`TransformRegistry::new`] verifies.
//!
//! [`TransformRegistry::new`]: super::TransformRegistry::new

mod content;
mod ecommerce;
mod exchange;
mod finance;
mod investment;
mod support;
mod users;

use super::{Descriptor, TableTransform, TransformFn};

pub(crate) const fn describe(
    old_table: &'static str,
    new_table: &'static str,
    stable_id: Option<&'static str>,
    depends_on: &'static [&'static str],
    build: TransformFn,
) -> Descriptor {
    Descriptor {
        old_table,
        new_table,
        stable_id,
        depends_on,
        build,
    }
}

/// Every built-in descriptor, in dependency order.
pub fn descriptors() -> Vec<Descriptor> {
    users::DESCRIPTORS
        .iter()
        .chain(finance::DESCRIPTORS.iter())
        .chain(exchange::DESCRIPTORS.iter())
        .chain(ecommerce::DESCRIPTORS.iter())
        .chain(content::DESCRIPTORS.iter())
        .chain(support::DESCRIPTORS.iter())
        .chain(investment::DESCRIPTORS.iter())
        .copied()
        .collect()
}

/// Boxed for [`super::TransformRegistry`].
pub fn all() -> Vec<Box<dyn TableTransform>> {
    descriptors()
        .into_iter()
        .map(|d| Box::new(d) as Box<dyn TableTransform>)
        .collect()
}
