//! Currencies, payment gateways and methods, wallets and transactions.

use rust_decimal::Decimal;

use super::{describe, Descriptor};
use crate::core::NewRecord;
use crate::transform::RowContext;

pub const DESCRIPTORS: [Descriptor; 6] = [
    describe("currency", "currency", Some("code"), &[], currency),
    describe("deposit_gateway", "deposit_gateway", None, &[], deposit_gateway),
    describe("deposit_method", "deposit_method", None, &[], deposit_method),
    describe("withdraw_method", "withdraw_method", None, &[], withdraw_method),
    describe("wallet", "wallet", Some("uuid"), &["user"], wallet),
    describe(
        "transaction",
        "transaction",
        Some("uuid"),
        &["user", "wallet"],
        transaction,
    ),
];

/// Fee and limit columns shared by gateways and methods.
fn with_fees(record: NewRecord, ctx: &RowContext<'_>) -> NewRecord {
    let r = ctx.record;
    record
        .field("fixedFee", r.decimal_or("fixed_fee", Decimal::ZERO))
        .field("percentageFee", r.decimal_or("percentage_fee", Decimal::ZERO))
        .field("minAmount", r.decimal_or("min_amount", Decimal::ZERO))
        .field_opt("maxAmount", r.decimal("max_amount"))
}

fn currency(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    r.non_empty("code")?;
    Some(
        ctx.base()
            .field("name", r.string_or("name", ""))
            .field_opt("symbol", r.string("symbol"))
            .field("precision", r.int_or("precision", 2))
            .field_opt("price", r.decimal("price"))
            .field("status", r.bool_or("status", true)),
    )
}

fn deposit_gateway(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let name = r.string("name")?;
    let base = ctx
        .base()
        .field("name", name.clone())
        .field("title", r.string_or("title", &name))
        .field_opt("description", r.string("description"))
        .field_opt("image", r.string("image"))
        .field_opt("alias", r.string("alias"))
        .field_opt("currencies", r.json("currencies"))
        .field("status", r.bool_or("status", true))
        .field_opt("version", r.string("version"));
    Some(with_fees(base, ctx))
}

fn deposit_method(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let title = r.string("title")?;
    let base = ctx
        .base()
        .field("title", title)
        .field("instructions", r.string_or("instructions", ""))
        .field_opt("image", r.string("image"))
        .field_opt("customFields", r.json("custom_fields"))
        .field("status", r.bool_or("status", true));
    Some(with_fees(base, ctx))
}

fn withdraw_method(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let title = r.string("title")?;
    let base = ctx
        .base()
        .field("title", title)
        .field_opt("processingTime", r.string("processing_time"))
        .field_opt("instructions", r.string("instructions"))
        .field_opt("image", r.string("image"))
        .field_opt("customFields", r.json("custom_fields"))
        .field("status", r.bool_or("status", true));
    Some(with_fees(base, ctx))
}

fn wallet(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let user_id = ctx.resolve("user", "user_id")?;
    let currency = r.string("currency")?.to_uppercase();
    let balance = r.checked_decimal_or("balance", Decimal::ZERO)?;
    Some(
        ctx.base()
            .field("userId", user_id)
            .field("type", r.string_or("type", "FIAT").to_uppercase())
            .field("currency", currency)
            .field("balance", balance)
            .field("inOrder", r.decimal_or("in_order", Decimal::ZERO))
            .field_opt("address", r.json("addresses"))
            .field("status", r.bool_or("status", true)),
    )
}

fn transaction(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let user_id = ctx.resolve("user", "user_id")?;
    let wallet_id = ctx.resolve("wallet", "wallet_id")?;
    let kind = r.string("type")?.to_uppercase();
    let amount = r.checked_decimal_or("amount", Decimal::ZERO)?;
    Some(
        ctx.base()
            .field("userId", user_id)
            .field("walletId", wallet_id)
            .field("type", kind)
            .field("status", r.string_or("status", "PENDING").to_uppercase())
            .field("amount", amount)
            .field("fee", r.decimal_or("fee", Decimal::ZERO))
            .field_opt("description", r.string("description"))
            .field_opt("metadata", r.json("metadata"))
            .field_opt("referenceId", r.string("reference_id"))
            .field_opt("trxId", r.string("trx_id")),
    )
}
