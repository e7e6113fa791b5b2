//! Support tickets.

use super::{describe, Descriptor};
use crate::core::NewRecord;
use crate::transform::RowContext;

pub const DESCRIPTORS: [Descriptor; 1] = [describe(
    "support_ticket",
    "support_ticket",
    Some("uuid"),
    &["user"],
    ticket,
)];

fn ticket(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let user_id = ctx.resolve("user", "user_id")?;
    let agent_id = ctx.resolve_optional("user", "agent_id");
    Some(
        ctx.base()
            .field("userId", user_id)
            .field("agentId", agent_id)
            .field("subject", r.string_or("subject", "Support"))
            .field("importance", r.string_or("importance", "LOW").to_uppercase())
            .field("status", r.string_or("status", "PENDING").to_uppercase())
            .field("type", r.string_or("type", "LIVE").to_uppercase())
            .field_opt("messages", r.json("messages")),
    )
}
