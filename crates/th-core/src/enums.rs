//! Status enums, entity types, and actions for Trust Hub.
//!
//! Snapshot and request statuses serialize to the human-readable labels the
//! compliance program uses ("Not started", "Submitted to Auditor"), and accept
//! `snake_case` aliases so operators can type them on the command line.
//! Lifecycle enums use `snake_case` via `#[serde(rename_all = "snake_case")]`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// AuditStatus
// ---------------------------------------------------------------------------

/// Status of an audit period.
///
/// ```text
/// active → closed
/// ```
///
/// `closed` is terminal: there is no reopen path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Active,
    Closed,
}

impl AuditStatus {
    /// Valid next states from the current state.
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Active => &[Self::Closed],
            Self::Closed => &[],
        }
    }

    /// Check whether transitioning to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::Closed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ControlKind
// ---------------------------------------------------------------------------

/// Catalog classification of a control row.
///
/// `Policy` marks catalog entries that stand in for a policy requirement. It
/// is unrelated to the `Policy` document entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    Control,
    Policy,
}

impl ControlKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Control => "control",
            Self::Policy => "policy",
        }
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ImplementationStatus
// ---------------------------------------------------------------------------

/// Implementation progress of a control within one audit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum ImplementationStatus {
    #[default]
    #[serde(rename = "Not started", alias = "not_started")]
    NotStarted,
    #[serde(rename = "In Progress", alias = "in_progress")]
    InProgress,
    #[serde(rename = "Completed", alias = "completed")]
    Completed,
    #[serde(rename = "Effective", alias = "effective")]
    Effective,
}

impl ImplementationStatus {
    /// Whether the control counts as implemented on the dashboard.
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Completed | Self::Effective)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Effective => "Effective",
        }
    }
}

impl fmt::Display for ImplementationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TestingStatus
// ---------------------------------------------------------------------------

/// Auditor testing progress of a control within one audit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum TestingStatus {
    #[default]
    #[serde(rename = "Not tested", alias = "not_tested")]
    NotTested,
    #[serde(rename = "In Progress", alias = "in_progress")]
    InProgress,
    #[serde(rename = "Submitted to Auditor", alias = "submitted_to_auditor")]
    SubmittedToAuditor,
    #[serde(rename = "Effective", alias = "effective")]
    Effective,
}

impl TestingStatus {
    /// Whether the control counts as tested on the dashboard.
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::SubmittedToAuditor | Self::Effective)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotTested => "Not tested",
            Self::InProgress => "In Progress",
            Self::SubmittedToAuditor => "Submitted to Auditor",
            Self::Effective => "Effective",
        }
    }
}

impl fmt::Display for TestingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AutomationStatus
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum AutomationStatus {
    #[default]
    #[serde(rename = "Not started", alias = "not_started")]
    NotStarted,
    #[serde(rename = "In Progress", alias = "in_progress")]
    InProgress,
    #[serde(rename = "Completed", alias = "completed")]
    Completed,
}

impl AutomationStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for AutomationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RequestStatus
// ---------------------------------------------------------------------------

/// Status of an auditor request.
///
/// Requests move freely between these states; only `Closed` stops counting
/// toward the open-request metric.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum RequestStatus {
    #[default]
    #[serde(rename = "Open", alias = "open")]
    Open,
    #[serde(rename = "In Progress", alias = "in_progress")]
    InProgress,
    #[serde(rename = "Submitted to Auditor", alias = "submitted_to_auditor")]
    SubmittedToAuditor,
    #[serde(rename = "Needs Revision", alias = "needs_revision")]
    NeedsRevision,
    #[serde(rename = "Closed", alias = "closed")]
    Closed,
}

impl RequestStatus {
    #[must_use]
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Closed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::SubmittedToAuditor => "Submitted to Auditor",
            Self::NeedsRevision => "Needs Revision",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum Priority {
    #[serde(rename = "Low", alias = "low")]
    Low,
    #[default]
    #[serde(rename = "Medium", alias = "medium")]
    Medium,
    #[serde(rename = "High", alias = "high")]
    High,
}

impl Priority {
    /// Sort rank, highest priority first.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RelationshipType
// ---------------------------------------------------------------------------

/// How a policy document relates to a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Fulfills,
    Governs,
    RequiresAcknowledgement,
}

impl RelationshipType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fulfills => "fulfills",
            Self::Governs => "governs",
            Self::RequiresAcknowledgement => "requires_acknowledgement",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ActivityAction
// ---------------------------------------------------------------------------

/// Action recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Updated,
    Deleted,
    Linked,
    StatusChanged,
    Cloned,
    Imported,
}

impl ActivityAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Linked => "linked",
            Self::StatusChanged => "status_changed",
            Self::Cloned => "cloned",
            Self::Imported => "imported",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

/// Entity types referenced by errors and activity entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Audit,
    Control,
    Criterion,
    Snapshot,
    Policy,
    Request,
    Evidence,
    Comment,
}

impl EntityType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Audit => "audit",
            Self::Control => "control",
            Self::Criterion => "criterion",
            Self::Snapshot => "snapshot",
            Self::Policy => "policy",
            Self::Request => "request",
            Self::Evidence => "evidence",
            Self::Comment => "comment",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_serde_roundtrip {
        ($name:ident, $ty:ty, $variant:expr, $expected_str:expr) => {
            #[test]
            fn $name() {
                let val = $variant;
                let json = serde_json::to_string(&val).unwrap();
                assert_eq!(json, format!("\"{}\"", $expected_str));
                let recovered: $ty = serde_json::from_str(&json).unwrap();
                assert_eq!(recovered, val);
            }
        };
    }

    test_serde_roundtrip!(audit_active, AuditStatus, AuditStatus::Active, "active");
    test_serde_roundtrip!(
        impl_not_started,
        ImplementationStatus,
        ImplementationStatus::NotStarted,
        "Not started"
    );
    test_serde_roundtrip!(
        testing_submitted,
        TestingStatus,
        TestingStatus::SubmittedToAuditor,
        "Submitted to Auditor"
    );
    test_serde_roundtrip!(
        request_needs_revision,
        RequestStatus,
        RequestStatus::NeedsRevision,
        "Needs Revision"
    );
    test_serde_roundtrip!(priority_high, Priority, Priority::High, "High");
    test_serde_roundtrip!(
        relationship_ack,
        RelationshipType,
        RelationshipType::RequiresAcknowledgement,
        "requires_acknowledgement"
    );
    test_serde_roundtrip!(
        action_status_changed,
        ActivityAction,
        ActivityAction::StatusChanged,
        "status_changed"
    );
    test_serde_roundtrip!(entity_criterion, EntityType, EntityType::Criterion, "criterion");

    #[test]
    fn audit_close_is_terminal() {
        assert!(AuditStatus::Active.can_transition_to(AuditStatus::Closed));
        assert!(!AuditStatus::Closed.can_transition_to(AuditStatus::Active));
        assert!(!AuditStatus::Closed.can_transition_to(AuditStatus::Closed));
        assert!(AuditStatus::Closed.allowed_next_states().is_empty());
    }

    #[test]
    fn snake_case_aliases_parse() {
        let status: TestingStatus = serde_json::from_str("\"submitted_to_auditor\"").unwrap();
        assert_eq!(status, TestingStatus::SubmittedToAuditor);
        let status: ImplementationStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(status, ImplementationStatus::InProgress);
    }

    #[test]
    fn as_str_matches_serde() {
        for status in [
            RequestStatus::Open,
            RequestStatus::InProgress,
            RequestStatus::SubmittedToAuditor,
            RequestStatus::NeedsRevision,
            RequestStatus::Closed,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn defaults_match_new_snapshot_state() {
        assert_eq!(ImplementationStatus::default(), ImplementationStatus::NotStarted);
        assert_eq!(TestingStatus::default(), TestingStatus::NotTested);
        assert_eq!(AutomationStatus::default(), AutomationStatus::NotStarted);
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!(RequestStatus::default(), RequestStatus::Open);
    }

    #[test]
    fn done_flags() {
        assert!(ImplementationStatus::Effective.is_done());
        assert!(!ImplementationStatus::InProgress.is_done());
        assert!(TestingStatus::SubmittedToAuditor.is_done());
        assert!(!TestingStatus::NotTested.is_done());
        assert!(!RequestStatus::Closed.is_open());
        assert!(Priority::High.rank() < Priority::Low.rank());
    }
}
