use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{Priority, RequestStatus};

/// An auditor request, scoped to the audit it was raised in.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Request {
    pub id: String,
    pub audit_id: String,
    pub external_ref: Option<String>,
    pub summary: String,
    pub description: Option<String>,
    pub status: RequestStatus,
    pub priority: Priority,
    pub assignee: Option<String>,
    pub source: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
