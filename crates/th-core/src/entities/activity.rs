use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{ActivityAction, EntityType};

/// An append-only activity log entry recording a mutation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ActivityEntry {
    pub id: String,
    pub audit_id: Option<String>,
    pub actor: String,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub action: ActivityAction,
    pub detail: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
