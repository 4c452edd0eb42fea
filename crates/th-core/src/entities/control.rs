use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::ControlKind;

/// Master catalog record for a control. Period-independent.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Control {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub domain: Option<String>,
    pub kind: ControlKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
