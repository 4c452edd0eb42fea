//! ID prefixes for generated identifiers.
//!
//! Generated IDs have the shape `{prefix}-{8 hex chars}`, produced by the
//! database layer from `randomblob(4)`. Audits, controls, criteria, and
//! requests carry operator-chosen identifiers and have no prefix.

pub const PREFIX_POLICY: &str = "pol";
pub const PREFIX_EVIDENCE: &str = "evd";
pub const PREFIX_COMMENT: &str = "cmt";
pub const PREFIX_ACTIVITY: &str = "act";

/// Check whether `id` looks like a generated ID with the given prefix.
#[must_use]
pub fn has_prefix(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|hex| hex.len() == 8 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}
