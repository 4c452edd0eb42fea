//! Policy update builder.
//!
//! Field changes and relationship-set replacement travel together so both
//! land in one transaction.

use chrono::NaiveDate;
use serde::Serialize;
use th_core::enums::RelationshipType;

use super::SetClause;
use crate::helpers::format_date;

/// Desired relationship of a policy to one control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyLink {
    pub control_id: String,
    pub relationship_type: RelationshipType,
}

impl PolicyLink {
    #[must_use]
    pub fn new(control_id: impl Into<String>, relationship_type: RelationshipType) -> Self {
        Self {
            control_id: control_id.into(),
            relationship_type,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PolicyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_date: Option<Option<NaiveDate>>,
    /// Full replacement of the policy's control relationships.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controls: Option<Vec<PolicyLink>>,
}

impl PolicyUpdate {
    /// True when neither fields nor relationships would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controls.is_none() && self.set_clause().is_empty()
    }

    pub(crate) fn set_clause(&self) -> SetClause {
        let mut set = SetClause::default();
        if let Some(ref name) = self.name {
            set.push("name", name.clone());
        }
        if let Some(ref description) = self.description {
            set.push_opt("description", description.clone());
        }
        if let Some(ref version) = self.version {
            set.push_opt("version", version.clone());
        }
        if let Some(ref owner) = self.owner {
            set.push_opt("owner", owner.clone());
        }
        if let Some(ref file_path) = self.file_path {
            set.push_opt("file_path", file_path.clone());
        }
        if let Some(review_date) = self.review_date {
            set.push_opt("review_date", review_date.map(format_date));
        }
        set
    }
}

pub struct PolicyUpdateBuilder(PolicyUpdate);

impl PolicyUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(PolicyUpdate::default())
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.0.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.0.description = Some(description);
        self
    }

    #[must_use]
    pub fn version(mut self, version: Option<String>) -> Self {
        self.0.version = Some(version);
        self
    }

    #[must_use]
    pub fn owner(mut self, owner: Option<String>) -> Self {
        self.0.owner = Some(owner);
        self
    }

    #[must_use]
    pub fn file_path(mut self, file_path: Option<String>) -> Self {
        self.0.file_path = Some(file_path);
        self
    }

    #[must_use]
    pub const fn review_date(mut self, review_date: Option<NaiveDate>) -> Self {
        self.0.review_date = Some(review_date);
        self
    }

    #[must_use]
    pub fn controls(mut self, controls: Vec<PolicyLink>) -> Self {
        self.0.controls = Some(controls);
        self
    }

    #[must_use]
    pub fn build(self) -> PolicyUpdate {
        self.0
    }
}

impl Default for PolicyUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
