//! Investment plans, durations and user investments.

use rust_decimal::Decimal;

use super::{describe, Descriptor};
use crate::core::NewRecord;
use crate::transform::RowContext;

pub const DESCRIPTORS: [Descriptor; 3] = [
    describe("investment_plan", "investment_plan", None, &[], plan),
    describe("investment_duration", "investment_duration", None, &[], duration),
    describe(
        "investment",
        "investment",
        Some("uuid"),
        &["user", "investment_plan", "investment_duration"],
        investment,
    ),
];

fn plan(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let name = r.string("name")?;
    Some(
        ctx.base()
            .field("title", r.string_or("title", &name))
            .field("name", name)
            .field_opt("image", r.string("image"))
            .field("description", r.string_or("description", ""))
            .field("currency", r.string_or("currency", "USDT").to_uppercase())
            .field("walletType", r.string_or("wallet_type", "SPOT").to_uppercase())
            .field("minAmount", r.decimal_or("min_amount", Decimal::ZERO))
            .field_opt("maxAmount", r.decimal("max_amount"))
            .field("invested", r.decimal_or("invested", Decimal::ZERO))
            .field_opt("profitPercentage", r.decimal("profit_percentage"))
            .field_opt("minProfit", r.decimal("min_profit"))
            .field_opt("maxProfit", r.decimal("max_profit"))
            .field_opt("defaultProfit", r.decimal("default_profit"))
            .field("defaultResult", r.string_or("default_result", "WIN").to_uppercase())
            .field("trending", r.bool_or("trending", false))
            .field("status", r.bool_or("status", true)),
    )
}

fn duration(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let length = r.int("duration")?;
    Some(
        ctx.base()
            .field("duration", length)
            .field("timeframe", r.string_or("timeframe", "DAY").to_uppercase()),
    )
}

fn investment(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let user_id = ctx.resolve("user", "user_id")?;
    let plan_id = ctx.resolve("investment_plan", "plan_id")?;
    let duration_id = ctx.resolve("investment_duration", "duration_id")?;
    Some(
        ctx.base()
            .field("userId", user_id)
            .field("planId", plan_id)
            .field("durationId", duration_id)
            .field("amount", r.decimal_or("amount", Decimal::ZERO))
            .field("profit", r.decimal_or("profit", Decimal::ZERO))
            .field_opt("result", r.string("result").map(|s| s.to_uppercase()))
            .field("status", r.string_or("status", "ACTIVE").to_uppercase())
            .field_opt("endDate", r.timestamp("end_date")),
    )
}
