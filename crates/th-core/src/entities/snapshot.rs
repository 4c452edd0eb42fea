use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{AutomationStatus, ImplementationStatus, TestingStatus};

/// Per-audit compliance state of one control.
///
/// Identity is `(control_id, audit_id)`. Every control has exactly one
/// snapshot per audit.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ControlSnapshot {
    pub control_id: String,
    pub audit_id: String,
    pub implementation_status: ImplementationStatus,
    pub testing_status: TestingStatus,
    pub automation_status: AutomationStatus,
    pub owner: Option<String>,
    pub freshness_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
