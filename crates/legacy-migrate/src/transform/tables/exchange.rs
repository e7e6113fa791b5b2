//! Spot exchange markets, orders and watchlists.

use rust_decimal::Decimal;

use super::{describe, Descriptor};
use crate::core::NewRecord;
use crate::transform::RowContext;

pub const DESCRIPTORS: [Descriptor; 3] = [
    describe("exchange_market", "exchange_market", None, &[], market),
    describe("exchange_order", "exchange_order", Some("uuid"), &["user"], order),
    describe("exchange_watchlist", "exchange_watchlist", None, &["user"], watchlist),
];

fn market(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let currency = r.string("currency")?.to_uppercase();
    let pair = r.string("pair")?.to_uppercase();
    Some(
        ctx.base()
            .field("currency", currency)
            .field("pair", pair)
            .field("isTrending", r.bool_or("is_trending", false))
            .field("isHot", r.bool_or("is_hot", false))
            .field_opt("metadata", r.json("metadata"))
            .field("status", r.bool_or("status", true)),
    )
}

fn order(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let user_id = ctx.resolve("user", "user_id")?;
    let symbol = r.string("symbol")?;
    let amount = r.checked_decimal_or("amount", Decimal::ZERO)?;
    let filled = r.checked_decimal_or("filled", Decimal::ZERO)?;
    let remaining = match r.decimal("remaining") {
        Some(remaining) => remaining,
        None => amount.checked_sub(filled)?,
    };
    Some(
        ctx.base()
            .field("userId", user_id)
            .field_opt("referenceId", r.string("reference_id"))
            .field("status", r.string_or("status", "OPEN").to_uppercase())
            .field("symbol", symbol)
            .field("type", r.string_or("type", "LIMIT").to_uppercase())
            .field("timeInForce", r.string_or("time_in_force", "GTC").to_uppercase())
            .field("side", r.string_or("side", "BUY").to_uppercase())
            .field("price", r.decimal_or("price", Decimal::ZERO))
            .field_opt("average", r.decimal("average"))
            .field("amount", amount)
            .field("filled", filled)
            .field("remaining", remaining)
            .field("cost", r.decimal_or("cost", Decimal::ZERO))
            .field_opt("trades", r.json("trades"))
            .field("fee", r.decimal_or("fee", Decimal::ZERO))
            .field_opt("feeCurrency", r.string("fee_currency")),
    )
}

fn watchlist(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let user_id = ctx.resolve("user", "user_id")?;
    let symbol = r.string("symbol")?;
    Some(
        ctx.base()
            .field("userId", user_id)
            .field("symbol", symbol)
            .field("type", r.string_or("type", "TRADE").to_uppercase()),
    )
}
