use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::AuditStatus;

/// A bounded compliance review period.
///
/// At most one audit is `active`. Once closed an audit and everything scoped
/// to it is read-only.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Audit {
    pub id: String,
    pub name: String,
    pub status: AuditStatus,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub auditor_firm: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Audit {
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.status.is_read_only()
    }
}
