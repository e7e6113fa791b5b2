//! Shop catalogue, orders, reviews and discounts.

use rust_decimal::Decimal;

use super::{describe, Descriptor};
use crate::core::NewRecord;
use crate::transform::coerce::slugify;
use crate::transform::RowContext;

pub const DESCRIPTORS: [Descriptor; 8] = [
    describe("ecommerce_category", "ecommerce_category", None, &[], category),
    describe(
        "ecommerce_product",
        "ecommerce_product",
        None,
        &["ecommerce_category"],
        product,
    ),
    describe(
        "ecommerce_discount",
        "ecommerce_discount",
        None,
        &["ecommerce_product"],
        discount,
    ),
    describe(
        "ecommerce_order",
        "ecommerce_order",
        Some("uuid"),
        &["user"],
        order,
    ),
    describe(
        "ecommerce_order_item",
        "ecommerce_order_item",
        None,
        &["ecommerce_order", "ecommerce_product"],
        order_item,
    ),
    describe(
        "ecommerce_review",
        "ecommerce_review",
        None,
        &["user", "ecommerce_product"],
        review,
    ),
    describe(
        "ecommerce_wishlist",
        "ecommerce_wishlist",
        None,
        &["user", "ecommerce_product"],
        wishlist,
    ),
    describe(
        "ecommerce_user_discount",
        "ecommerce_user_discount",
        None,
        &["user", "ecommerce_discount"],
        user_discount,
    ),
];

fn category(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let name = r.string("name")?;
    let slug = r.string("slug").unwrap_or_else(|| slugify(&name));
    Some(
        ctx.base()
            .field("name", name)
            .field("slug", slug)
            .field("description", r.string_or("description", ""))
            .field_opt("image", r.string("image"))
            .field("status", r.bool_or("status", true)),
    )
}

fn product(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let category_id = ctx.resolve("ecommerce_category", "category_id")?;
    let name = r.string("name")?;
    let slug = r.string("slug").unwrap_or_else(|| slugify(&name));
    Some(
        ctx.base()
            .field("categoryId", category_id)
            .field("name", name)
            .field("slug", slug)
            .field("description", r.string_or("description", ""))
            .field_opt("shortDescription", r.string("short_description"))
            .field("type", r.string_or("type", "DOWNLOADABLE").to_uppercase())
            .field("price", r.decimal_or("price", Decimal::ZERO))
            .field("currency", r.string_or("currency", "USD").to_uppercase())
            .field("walletType", r.string_or("wallet_type", "SPOT").to_uppercase())
            .field("inventoryQuantity", r.int_or("inventory_quantity", 0))
            .field_opt("image", r.string("image"))
            .field("status", r.bool_or("status", true)),
    )
}

fn discount(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let product_id = ctx.resolve("ecommerce_product", "product_id")?;
    let code = r.string("code")?;
    Some(
        ctx.base()
            .field("productId", product_id)
            .field("code", code)
            .field("percentage", r.int_or("percentage", 0))
            .field_opt("validUntil", r.timestamp("valid_until"))
            .field("status", r.bool_or("status", true)),
    )
}

fn order(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let user_id = ctx.resolve("user", "user_id")?;
    Some(
        ctx.base()
            .field("userId", user_id)
            .field("status", r.string_or("status", "PENDING").to_uppercase()),
    )
}

fn order_item(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let order_id = ctx.resolve("ecommerce_order", "order_id")?;
    let product_id = ctx.resolve("ecommerce_product", "product_id")?;
    Some(
        ctx.base()
            .field("orderId", order_id)
            .field("productId", product_id)
            .field("quantity", r.int_or("quantity", 1))
            .field_opt("key", r.string("key")),
    )
}

fn review(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let user_id = ctx.resolve("user", "user_id")?;
    let product_id = ctx.resolve("ecommerce_product", "product_id")?;
    Some(
        ctx.base()
            .field("userId", user_id)
            .field("productId", product_id)
            .field("rating", r.int_or("rating", 0).clamp(0, 5))
            .field_opt("comment", r.string("comment"))
            .field("status", r.bool_or("status", true)),
    )
}

fn wishlist(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let user_id = ctx.resolve("user", "user_id")?;
    let product_id = ctx.resolve("ecommerce_product", "product_id")?;
    Some(
        ctx.base()
            .field("userId", user_id)
            .field("productId", product_id),
    )
}

fn user_discount(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let user_id = ctx.resolve("user", "user_id")?;
    let discount_id = ctx.resolve("ecommerce_discount", "discount_id")?;
    Some(
        ctx.base()
            .field("userId", user_id)
            .field("discountId", discount_id)
            .field("status", r.bool_or("status", false)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LegacyRecord, SqlValue};
    use crate::dump::DumpValue;
    use crate::remap::IdentifierMap;
    use crate::transform::TableTransform;

    fn legacy(table: &str, pairs: &[(&'static str, &str)]) -> LegacyRecord {
        LegacyRecord::from_pairs(
            table,
            pairs
                .iter()
                .map(|(k, v)| (*k, DumpValue::Text(v.to_string()))),
        )
    }

    #[test]
    fn test_category_slug_is_derived() {
        let mut ids = IdentifierMap::new();
        let record = legacy("ecommerce_category", &[("id", "1"), ("name", "Gift Cards")]);
        let out = DESCRIPTORS[0].transform(&record, &mut ids).unwrap();
        assert_eq!(out.get("slug"), Some(&SqlValue::from("gift-cards")));
    }

    #[test]
    fn test_order_item_needs_both_references() {
        let mut ids = IdentifierMap::new();
        ids.set("ecommerce_order", "5", "o-5");
        let record = legacy(
            "ecommerce_order_item",
            &[("id", "1"), ("order_id", "5"), ("product_id", "9")],
        );
        assert!(DESCRIPTORS[4].transform(&record, &mut ids).is_none());

        ids.set("ecommerce_product", "9", "p-9");
        let out = DESCRIPTORS[4].transform(&record, &mut ids).unwrap();
        assert_eq!(out.get("quantity"), Some(&SqlValue::I64(1)));
    }
}
