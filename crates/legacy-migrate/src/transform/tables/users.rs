//! Accounts: users, KYC applications, API keys and notifications.

use super::{describe, Descriptor};
use crate::core::NewRecord;
use crate::transform::RowContext;

const DEFAULT_ROLE_ID: i64 = 4;

pub const DESCRIPTORS: [Descriptor; 4] = [
    describe("user", "user", Some("uuid"), &[], user),
    describe("kyc", "kyc_application", None, &["user"], kyc),
    describe("api_key", "api_key", None, &["user"], api_key),
    describe("notification", "notification", None, &["user"], notification),
];

fn user(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let email = r.string("email")?;
    Some(
        ctx.base()
            .field("email", email)
            .field_opt("password", r.string("password"))
            .field_opt("avatar", r.string("avatar"))
            .field_opt("firstName", r.string("first_name"))
            .field_opt("lastName", r.string("last_name"))
            .field("emailVerified", r.bool_or("email_verified", false))
            .field_opt("phone", r.string("phone"))
            .field("roleId", r.int_or("role_id", DEFAULT_ROLE_ID))
            .field("status", r.bool_or("status", true))
            .field("failedLoginAttempts", r.int_or("failed_login_attempts", 0))
            .field_opt("lastFailedLogin", r.timestamp("last_failed_login"))
            .field_opt("lastLogin", r.timestamp("last_login"))
            .field_opt("metadata", r.json("metadata")),
    )
}

fn kyc(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let user_id = ctx.resolve("user", "user_id")?;
    Some(
        ctx.base()
            .field("userId", user_id)
            .field("status", r.string_or("status", "PENDING").to_uppercase())
            .field("level", r.int_or("level", 1))
            .field_opt("data", r.json("data"))
            .field_opt("adminNotes", r.string("notes"))
            .field_opt("reviewedAt", r.timestamp("reviewed_at")),
    )
}

fn api_key(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let user_id = ctx.resolve("user", "user_id")?;
    let key = r.string("api_key").or_else(|| r.string("key"))?;
    Some(
        ctx.base()
            .field("userId", user_id)
            .field("name", r.string_or("name", "API Key"))
            .field("key", key)
            .field_opt("permissions", r.json("permissions"))
            .field_opt("ipWhitelist", r.json("ip_whitelist")),
    )
}

fn notification(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let user_id = ctx.resolve("user", "user_id")?;
    let message = r.string("message")?;
    Some(
        ctx.base()
            .field("userId", user_id)
            .field("type", r.string_or("type", "SYSTEM").to_uppercase())
            .field("title", r.string_or("title", ""))
            .field("message", message)
            .field_opt("link", r.string("link"))
            .field("read", r.bool_or("read", false)),
    )
}
