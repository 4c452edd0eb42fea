use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An append-only comment on a request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub request_id: String,
    pub author: String,
    pub body: String,
    pub visible_to_auditor: bool,
    pub created_at: DateTime<Utc>,
}
