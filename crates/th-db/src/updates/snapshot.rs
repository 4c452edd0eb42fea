//! Snapshot update builder.

use chrono::NaiveDate;
use serde::Serialize;
use th_core::enums::{AutomationStatus, ImplementationStatus, TestingStatus};

use super::SetClause;
use crate::helpers::format_date;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SnapshotUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation_status: Option<ImplementationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub testing_status: Option<TestingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automation_status: Option<AutomationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freshness_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl SnapshotUpdate {
    pub(crate) fn set_clause(&self) -> SetClause {
        let mut set = SetClause::default();
        if let Some(status) = self.implementation_status {
            set.push("implementation_status", status.as_str());
        }
        if let Some(status) = self.testing_status {
            set.push("testing_status", status.as_str());
        }
        if let Some(status) = self.automation_status {
            set.push("automation_status", status.as_str());
        }
        if let Some(ref owner) = self.owner {
            set.push_opt("owner", owner.clone());
        }
        if let Some(freshness) = self.freshness_date {
            set.push_opt("freshness_date", freshness.map(format_date));
        }
        if let Some(ref notes) = self.notes {
            set.push_opt("notes", notes.clone());
        }
        set
    }
}

pub struct SnapshotUpdateBuilder(SnapshotUpdate);

impl SnapshotUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(SnapshotUpdate::default())
    }

    #[must_use]
    pub const fn implementation_status(mut self, status: ImplementationStatus) -> Self {
        self.0.implementation_status = Some(status);
        self
    }

    #[must_use]
    pub const fn testing_status(mut self, status: TestingStatus) -> Self {
        self.0.testing_status = Some(status);
        self
    }

    #[must_use]
    pub const fn automation_status(mut self, status: AutomationStatus) -> Self {
        self.0.automation_status = Some(status);
        self
    }

    #[must_use]
    pub fn owner(mut self, owner: Option<String>) -> Self {
        self.0.owner = Some(owner);
        self
    }

    #[must_use]
    pub const fn freshness_date(mut self, date: Option<NaiveDate>) -> Self {
        self.0.freshness_date = Some(date);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.0.notes = Some(notes);
        self
    }

    #[must_use]
    pub fn build(self) -> SnapshotUpdate {
        self.0
    }
}

impl Default for SnapshotUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
