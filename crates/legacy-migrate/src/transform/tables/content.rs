//! Blog and CMS content.

use super::{describe, Descriptor};
use crate::core::NewRecord;
use crate::transform::coerce::slugify;
use crate::transform::RowContext;

pub const DESCRIPTORS: [Descriptor; 7] = [
    describe("category", "category", None, &[], category),
    describe("tag", "tag", None, &[], tag),
    describe("author", "author", None, &["user"], author),
    describe("post", "post", None, &["author", "category"], post),
    describe("post_tag", "post_tag", None, &["post", "tag"], post_tag),
    describe("comment", "comment", None, &["post", "user"], comment),
    describe("page", "page", None, &[], page),
];

fn category(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let name = r.string("name")?;
    let slug = r.string("slug").unwrap_or_else(|| slugify(&name));
    Some(
        ctx.base()
            .field("name", name)
            .field("slug", slug)
            .field_opt("image", r.string("image"))
            .field_opt("description", r.string("description")),
    )
}

fn tag(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let name = r.string("name")?;
    let slug = r.string("slug").unwrap_or_else(|| slugify(&name));
    Some(ctx.base().field("name", name).field("slug", slug))
}

fn author(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let user_id = ctx.resolve("user", "user_id")?;
    Some(
        ctx.base()
            .field("userId", user_id)
            .field("status", r.string_or("status", "PENDING").to_uppercase()),
    )
}

fn post(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let author_id = ctx.resolve("author", "author_id")?;
    let category_id = ctx.resolve_optional("category", "category_id");
    let title = r.string("title")?;
    let slug = r.string("slug").unwrap_or_else(|| slugify(&title));
    Some(
        ctx.base()
            .field("authorId", author_id)
            .field("categoryId", category_id)
            .field("title", title)
            .field("content", r.string_or("content", ""))
            .field_opt("description", r.string("description"))
            .field("slug", slug)
            .field("status", r.string_or("status", "DRAFT").to_uppercase())
            .field_opt("image", r.string("image")),
    )
}

fn post_tag(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let post_id = ctx.resolve("post", "post_id")?;
    let tag_id = ctx.resolve("tag", "tag_id")?;
    Some(ctx.base().field("postId", post_id).field("tagId", tag_id))
}

fn comment(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let post_id = ctx.resolve("post", "post_id")?;
    let user_id = ctx.resolve("user", "user_id")?;
    let content = r.string("content")?;
    Some(
        ctx.base()
            .field("postId", post_id)
            .field("userId", user_id)
            .field("content", content),
    )
}

fn page(ctx: &mut RowContext<'_>) -> Option<NewRecord> {
    let r = ctx.record;
    let title = r.string("title")?;
    let slug = r.string("slug").unwrap_or_else(|| slugify(&title));
    Some(
        ctx.base()
            .field("title", title)
            .field("content", r.string_or("content", ""))
            .field_opt("description", r.string("description"))
            .field_opt("image", r.string("image"))
            .field("slug", slug)
            .field("status", r.string_or("status", "PUBLISHED").to_uppercase())
            .field("order", r.int_or("order", 0)),
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
    fn test_post_with_unknown_category_keeps_null_category() {
        let mut ids = IdentifierMap::new();
        ids.set("author", "2", "a-2");
        let record = legacy(
            "post",
            &[
                ("id", "11"),
                ("author_id", "2"),
                ("category_id", "99"),
                ("title", "Hello World"),
            ],
        );
        let out = DESCRIPTORS[3].transform(&record, &mut ids).unwrap();
        assert_eq!(out.get("categoryId"), Some(&SqlValue::Null));
        assert_eq!(out.get("slug"), Some(&SqlValue::from("hello-world")));
        assert_eq!(out.get("status"), Some(&SqlValue::from("DRAFT")));
    }

    #[test]
    fn test_post_without_author_is_skipped() {
        let mut ids = IdentifierMap::new();
        let record = legacy("post", &[("id", "11"), ("author_id", "2"), ("title", "T")]);
        assert!(DESCRIPTORS[3].transform(&record, &mut ids).is_none());
    }
}
