//! Typed activity detail payloads.
//!
//! Each activity action can carry a structured `detail` JSON blob. Updates
//! store the serialized update struct directly; the shapes below cover the
//! lifecycle and link actions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Detail for `ActivityAction::StatusChanged`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StatusChangedDetail {
    pub from: String,
    pub to: String,
}

/// Detail for `ActivityAction::Cloned` on audit start.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ClonedDetail {
    pub source_audit_id: String,
    pub snapshots_cloned: u64,
    pub snapshots_defaulted: u64,
}

/// Detail for `ActivityAction::Imported`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ImportedDetail {
    pub status: String,
    pub snapshots_created: u64,
}

/// Detail for `ActivityAction::Linked`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct LinkedDetail {
    pub target_type: String,
    pub target_id: String,
    /// `false` when the link already existed.
    pub inserted: bool,
}

/// Detail for `ActivityAction::Deleted` on requests.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CascadeDetail {
    /// `(table, rows removed)` in deletion order.
    pub removed: Vec<(String, u64)>,
}
