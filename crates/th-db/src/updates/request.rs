//! Request update builder.

use chrono::NaiveDate;
use serde::Serialize;
use th_core::enums::{Priority, RequestStatus};

use super::SetClause;
use crate::helpers::format_date;

#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RequestStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
}

impl RequestUpdate {
    pub(crate) fn set_clause(&self) -> SetClause {
        let mut set = SetClause::default();
        if let Some(ref summary) = self.summary {
            set.push("summary", summary.clone());
        }
        if let Some(ref description) = self.description {
            set.push_opt("description", description.clone());
        }
        if let Some(status) = self.status {
            set.push("status", status.as_str());
        }
        if let Some(priority) = self.priority {
            set.push("priority", priority.as_str());
        }
        if let Some(ref assignee) = self.assignee {
            set.push_opt("assignee", assignee.clone());
        }
        if let Some(ref source) = self.source {
            set.push_opt("source", source.clone());
        }
        if let Some(due_date) = self.due_date {
            set.push_opt("due_date", due_date.map(format_date));
        }
        set
    }
}

pub struct RequestUpdateBuilder(RequestUpdate);

impl RequestUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(RequestUpdate::default())
    }

    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.0.summary = Some(summary.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.0.description = Some(description);
        self
    }

    #[must_use]
    pub const fn status(mut self, status: RequestStatus) -> Self {
        self.0.status = Some(status);
        self
    }

    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.0.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn assignee(mut self, assignee: Option<String>) -> Self {
        self.0.assignee = Some(assignee);
        self
    }

    #[must_use]
    pub fn source(mut self, source: Option<String>) -> Self {
        self.0.source = Some(source);
        self
    }

    #[must_use]
    pub const fn due_date(mut self, due_date: Option<NaiveDate>) -> Self {
        self.0.due_date = Some(due_date);
        self
    }

    #[must_use]
    pub fn build(self) -> RequestUpdate {
        self.0
    }
}

impl Default for RequestUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
