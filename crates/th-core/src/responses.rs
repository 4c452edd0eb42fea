//! Listing rows, detail views, and dashboard payloads returned by the query
//! layer and rendered as JSON by `thub`.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::coverage::CoverageState;
use crate::entities::{Audit, Comment, Control, ControlSnapshot, Criterion, Evidence, Policy, Request};
use crate::enums::{ImplementationStatus, Priority, RelationshipType, RequestStatus, TestingStatus};
use crate::freshness::ReviewState;

/// Result of resolving which audit a caller is working in.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AuditSelection {
    pub audits: Vec<Audit>,
    pub selected: Audit,
    pub is_read_only: bool,
}

// ---------------------------------------------------------------------------
// Controls
// ---------------------------------------------------------------------------

/// One row of `thub control list`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ControlListRow {
    pub id: String,
    pub name: String,
    pub implementation_status: ImplementationStatus,
    pub testing_status: TestingStatus,
    pub freshness_date: Option<NaiveDate>,
    pub owner_display: String,
    pub evidence_count: u32,
    pub criteria_count: u32,
    pub stale: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ControlPolicyLink {
    pub policy_id: String,
    pub name: String,
    pub review_date: Option<NaiveDate>,
    pub relationship_type: RelationshipType,
}

/// Compact request reference shown on a control's detail page.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RequestSummary {
    pub id: String,
    pub summary: String,
    pub status: RequestStatus,
    pub priority: Priority,
    pub assignee: Option<String>,
}

/// A control as seen from one audit.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ControlDetail {
    pub control: Control,
    pub snapshot: ControlSnapshot,
    pub owner_display: String,
    pub stale: bool,
    pub criteria: Vec<Criterion>,
    pub policies: Vec<ControlPolicyLink>,
    pub evidence: Vec<Evidence>,
    pub requests: Vec<RequestSummary>,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RequestListRow {
    pub id: String,
    pub summary: String,
    pub status: RequestStatus,
    pub priority: Priority,
    pub assignee: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub linked_controls: u32,
    pub evidence_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ControlRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RequestDetail {
    pub request: Request,
    pub controls: Vec<ControlRef>,
    pub evidence: Vec<Evidence>,
    pub comments: Vec<Comment>,
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PolicyListRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub review_date: Option<NaiveDate>,
    pub file_path: Option<String>,
    pub linked_controls: u32,
    pub relationship_types: Vec<RelationshipType>,
    pub review_state: ReviewState,
}

/// A linked control with its state in the audit being viewed.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PolicyControlStatus {
    pub relationship_type: RelationshipType,
    pub control_id: String,
    pub control_name: String,
    pub implementation_status: Option<ImplementationStatus>,
    pub testing_status: Option<TestingStatus>,
    pub has_evidence: bool,
    /// `requires_acknowledgement` links that have evidence in the audit.
    pub acknowledged: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PolicyDetail {
    pub policy: Policy,
    pub review_state: ReviewState,
    pub linked_controls: Vec<PolicyControlStatus>,
}

// ---------------------------------------------------------------------------
// Evidence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct EvidenceListRow {
    #[serde(flatten)]
    pub evidence: Evidence,
    /// Controls linked in the audit being viewed.
    pub linked_controls: Vec<String>,
    /// Requests of the audit being viewed that reference this evidence.
    pub linked_requests: Vec<String>,
    pub missing_control_links: bool,
}

// ---------------------------------------------------------------------------
// Criteria matrix
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MatrixControl {
    pub id: String,
    pub name: String,
    pub implementation_status: Option<ImplementationStatus>,
    pub testing_status: Option<TestingStatus>,
    pub has_evidence: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CriterionCoverage {
    pub id: String,
    pub name: String,
    pub category: String,
    pub subcategory: String,
    pub coverage: CoverageState,
    pub controls: Vec<MatrixControl>,
}

impl CriterionCoverage {
    /// Build a matrix entry, classifying coverage from the mapped controls.
    #[must_use]
    pub fn new(criterion: &Criterion, controls: Vec<MatrixControl>) -> Self {
        let mapped = u32::try_from(controls.len()).unwrap_or(u32::MAX);
        let with_evidence =
            u32::try_from(controls.iter().filter(|c| c.has_evidence).count()).unwrap_or(u32::MAX);
        Self {
            id: criterion.id.clone(),
            name: criterion.name.clone(),
            category: criterion.category_or_default().to_string(),
            subcategory: criterion.subcategory_or_default().to_string(),
            coverage: CoverageState::classify(mapped, with_evidence),
            controls,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CriteriaMatrix {
    pub criteria: Vec<CriterionCoverage>,
    /// Sorted distinct categories of the returned criteria.
    pub categories: Vec<String>,
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DashboardMetrics {
    pub total_controls: u32,
    pub implementation_done: u32,
    pub testing_done: u32,
    pub stale_controls: u32,
    pub controls_with_evidence: u32,
    pub open_requests: u32,
}

/// A control needing attention: stale, or without evidence.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AttentionRow {
    pub control_id: String,
    pub name: String,
    pub freshness_date: Option<NaiveDate>,
    pub evidence_count: u32,
    pub implementation_status: ImplementationStatus,
    pub testing_status: TestingStatus,
    pub stale: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Dashboard {
    pub audit: Audit,
    pub metrics: DashboardMetrics,
    pub attention: Vec<AttentionRow>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn matrix_control(id: &str, has_evidence: bool) -> MatrixControl {
        MatrixControl {
            id: id.to_string(),
            name: format!("{id} name"),
            implementation_status: Some(ImplementationStatus::Completed),
            testing_status: None,
            has_evidence,
        }
    }

    #[test]
    fn criterion_coverage_applies_defaults_and_classifies() {
        let criterion = Criterion {
            id: "CC1.1".to_string(),
            name: "Integrity and ethics".to_string(),
            category: None,
            subcategory: Some("  ".to_string()),
        };
        let entry = CriterionCoverage::new(
            &criterion,
            vec![matrix_control("CTL-001", true), matrix_control("CTL-002", false)],
        );
        assert_eq!(entry.category, "Uncategorized");
        assert_eq!(entry.subcategory, "General");
        assert_eq!(entry.coverage, CoverageState::Partial);
    }

    #[test]
    fn criterion_without_controls_is_uncovered() {
        let criterion = Criterion {
            id: "CC9.9".to_string(),
            name: "Unmapped".to_string(),
            category: Some("Risk".to_string()),
            subcategory: None,
        };
        let entry = CriterionCoverage::new(&criterion, Vec::new());
        assert_eq!(entry.coverage, CoverageState::Uncovered);
        assert_eq!(entry.category, "Risk");
    }
}
