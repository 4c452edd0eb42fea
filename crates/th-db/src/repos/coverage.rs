//! Coverage query engine: audit-scoped listings, detail views, the criteria
//! matrix, and the dashboard.
//!
//! Every listing is scoped by audit id, takes a typed filter, and orders by a
//! fixed sort key with the primary id as tie-break. An unknown audit yields
//! empty results; detail lookups report it as `NotFound`. Control rows cover
//! `kind = 'control'` only.

use chrono::NaiveDate;
use serde::Deserialize;

use th_core::coverage::{ATTENTION_LIMIT, CoverageState};
use th_core::entities::Criterion;
use th_core::enums::{
    AutomationStatus, EntityType, ImplementationStatus, Priority, RequestStatus, TestingStatus,
};
use th_core::freshness::{is_stale, owner_display_name};
use th_core::responses::{
    AttentionRow, ControlDetail, ControlListRow, ControlPolicyLink, ControlRef, CriteriaMatrix,
    CriterionCoverage, Dashboard, DashboardMetrics, EvidenceListRow, MatrixControl,
    RequestDetail, RequestListRow, RequestSummary,
};

use crate::error::DatabaseError;
use crate::helpers::{
    format_date, get_count, get_flag, get_list, get_opt_date, get_opt_enum, get_opt_string,
    parse_enum, today,
};
use crate::repos::catalog::row_to_criterion;
use crate::repos::evidence::row_to_evidence;
use crate::repos::filter::WhereBuilder;
use crate::service::TrustHubService;

/// Rank of an implementation status in lifecycle order, as SQL.
const IMPLEMENTATION_RANK: &str = "CASE cs.implementation_status
     WHEN 'Not started' THEN 0 WHEN 'In Progress' THEN 1
     WHEN 'Completed' THEN 2 WHEN 'Effective' THEN 3 ELSE 4 END";

const TESTING_RANK: &str = "CASE cs.testing_status
     WHEN 'Not tested' THEN 0 WHEN 'In Progress' THEN 1
     WHEN 'Submitted to Auditor' THEN 2 WHEN 'Effective' THEN 3 ELSE 4 END";

const REQUEST_STATUS_RANK: &str = "CASE r.status
     WHEN 'Open' THEN 0 WHEN 'In Progress' THEN 1 WHEN 'Needs Revision' THEN 2
     WHEN 'Submitted to Auditor' THEN 3 WHEN 'Closed' THEN 4 ELSE 5 END";

const PRIORITY_RANK: &str = "CASE r.priority WHEN 'High' THEN 0 WHEN 'Medium' THEN 1 WHEN 'Low' THEN 2 ELSE 3 END";

const EVIDENCE_EXISTS: &str = "EXISTS (SELECT 1 FROM control_evidence ce
     WHERE ce.control_id = c.id AND ce.audit_id = cs.audit_id)";

// ---------------------------------------------------------------------------
// Controls
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlSort {
    #[default]
    Name,
    Id,
    Implementation,
    Testing,
    /// Freshness date ascending, undated last.
    Freshness,
    /// Evidence count descending.
    Evidence,
    /// Mapped criteria count descending.
    Criteria,
}

impl ControlSort {
    fn order_by(self) -> String {
        match self {
            Self::Name => "lower(c.name), c.id".to_string(),
            Self::Id => "c.id".to_string(),
            Self::Implementation => format!("{IMPLEMENTATION_RANK}, c.id"),
            Self::Testing => format!("{TESTING_RANK}, c.id"),
            Self::Freshness => "cs.freshness_date IS NULL, cs.freshness_date, c.id".to_string(),
            Self::Evidence => "evidence_count DESC, c.id".to_string(),
            Self::Criteria => "criteria_count DESC, c.id".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ControlFilter {
    pub audit_id: String,
    /// Substring over id and name.
    pub q: Option<String>,
    pub implementation: Option<ImplementationStatus>,
    pub testing: Option<TestingStatus>,
    pub automation: Option<AutomationStatus>,
    pub has_evidence: Option<bool>,
    pub sort: ControlSort,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestSort {
    /// Request id.
    #[default]
    Reference,
    Status,
    /// High before Medium before Low.
    Priority,
    /// Unassigned last.
    Assignee,
    /// Evidence count descending.
    Evidence,
    /// Undated last.
    DueDate,
}

impl RequestSort {
    fn order_by(self) -> String {
        match self {
            Self::Reference => "r.id".to_string(),
            Self::Status => format!("{REQUEST_STATUS_RANK}, r.id"),
            Self::Priority => format!("{PRIORITY_RANK}, r.id"),
            Self::Assignee => "r.assignee IS NULL, lower(r.assignee), r.id".to_string(),
            Self::Evidence => "evidence_count DESC, r.id".to_string(),
            Self::DueDate => "r.due_date IS NULL, r.due_date, r.id".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub audit_id: String,
    /// Substring over id and summary.
    pub q: Option<String>,
    pub status: Option<RequestStatus>,
    pub priority: Option<Priority>,
    pub assignee: Option<String>,
    pub has_evidence: Option<bool>,
    pub sort: RequestSort,
}

// ---------------------------------------------------------------------------
// Evidence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSort {
    /// Newest upload first.
    #[default]
    Uploaded,
    Filename,
    /// Controls linked in the audit, descending.
    Controls,
}

impl EvidenceSort {
    const fn order_by(self) -> &'static str {
        match self {
            Self::Uploaded => "e.uploaded_at DESC, e.id DESC",
            Self::Filename => "lower(e.filename), e.id",
            Self::Controls => "control_link_count DESC, e.id",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EvidenceFilter {
    /// Scopes control and request links; evidence rows themselves are global.
    pub audit_id: String,
    /// Substring over filename and path.
    pub q: Option<String>,
    pub file_type: Option<String>,
    pub uploaded_by: Option<String>,
    pub has_control_links: Option<bool>,
    pub sort: EvidenceSort,
}

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CriteriaFilter {
    pub audit_id: String,
    /// Substring over id and name.
    pub q: Option<String>,
    /// Exact category, after defaulting blanks to `Uncategorized`.
    pub category: Option<String>,
    pub coverage: Option<CoverageState>,
}

/// Same folding as SQLite `lower()` in [`WhereBuilder::text`]: ASCII only.
fn matches_text(needle: Option<&str>, haystacks: &[&str]) -> bool {
    needle
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .is_none_or(|n| {
            let n = n.to_ascii_lowercase();
            haystacks.iter().any(|h| h.to_ascii_lowercase().contains(&n))
        })
}

impl TrustHubService {
    /// Control rows of an audit.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_controls(&self, filter: &ControlFilter) -> Result<Vec<ControlListRow>, DatabaseError> {
        self.list_controls_on(filter, today()).await
    }

    pub(crate) async fn list_controls_on(
        &self,
        filter: &ControlFilter,
        today: NaiveDate,
    ) -> Result<Vec<ControlListRow>, DatabaseError> {
        let mut w = WhereBuilder::default();
        w.eq("cs.audit_id", filter.audit_id.as_str());
        w.push("c.kind = 'control'".to_string());
        w.text(&["c.id", "c.name"], filter.q.as_deref());
        if let Some(status) = filter.implementation {
            w.eq("cs.implementation_status", status.as_str());
        }
        if let Some(status) = filter.testing {
            w.eq("cs.testing_status", status.as_str());
        }
        if let Some(status) = filter.automation {
            w.eq("cs.automation_status", status.as_str());
        }
        match filter.has_evidence {
            Some(true) => w.push(EVIDENCE_EXISTS.to_string()),
            Some(false) => w.push(format!("NOT {EVIDENCE_EXISTS}")),
            None => {}
        }

        let sql = format!(
            "SELECT c.id, c.name, cs.implementation_status, cs.testing_status,
                    cs.freshness_date, cs.owner,
                    (SELECT COUNT(DISTINCT ce.evidence_id) FROM control_evidence ce
                     WHERE ce.control_id = c.id AND ce.audit_id = cs.audit_id) AS evidence_count,
                    (SELECT COUNT(*) FROM control_criteria cc WHERE cc.control_id = c.id) AS criteria_count
             FROM control_snapshots cs
             JOIN controls c ON c.id = cs.control_id
             {}
             ORDER BY {}",
            w.clause(),
            filter.sort.order_by()
        );
        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(w.into_params()))
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            let freshness_date = get_opt_date(&row, 4)?;
            out.push(ControlListRow {
                id: row.get(0)?,
                name: row.get(1)?,
                implementation_status: parse_enum(&row.get::<String>(2)?)?,
                testing_status: parse_enum(&row.get::<String>(3)?)?,
                freshness_date,
                owner_display: owner_display_name(get_opt_string(&row, 5)?.as_deref()),
                evidence_count: get_count(&row, 6)?,
                criteria_count: get_count(&row, 7)?,
                stale: is_stale(freshness_date, today),
            });
        }
        Ok(out)
    }

    /// A control with its snapshot and everything linked to it in an audit.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown control or audit.
    pub async fn get_control_detail(
        &self,
        control_id: &str,
        audit_id: &str,
    ) -> Result<ControlDetail, DatabaseError> {
        let control = self.get_control(control_id).await?;
        self.get_audit(audit_id).await?;
        let snapshot = self.get_snapshot(control_id, audit_id).await?;
        let conn = self.db().conn();

        let mut rows = conn
            .query(
                "SELECT cr.id, cr.name, cr.category, cr.subcategory
                 FROM control_criteria cc JOIN criteria cr ON cr.id = cc.criteria_id
                 WHERE cc.control_id = ?1 ORDER BY cr.id",
                [control_id],
            )
            .await?;
        let mut criteria = Vec::new();
        while let Some(row) = rows.next().await? {
            criteria.push(row_to_criterion(&row)?);
        }

        let mut rows = conn
            .query(
                "SELECT p.id, p.name, p.review_date, pc.relationship_type
                 FROM policy_controls pc JOIN policies p ON p.id = pc.policy_id
                 WHERE pc.control_id = ?1 ORDER BY lower(p.name), p.id",
                [control_id],
            )
            .await?;
        let mut policies = Vec::new();
        while let Some(row) = rows.next().await? {
            policies.push(ControlPolicyLink {
                policy_id: row.get(0)?,
                name: row.get(1)?,
                review_date: get_opt_date(&row, 2)?,
                relationship_type: parse_enum(&row.get::<String>(3)?)?,
            });
        }

        let mut rows = conn
            .query(
                "SELECT e.id, e.filename, e.file_path, e.file_type, e.file_size, e.description,
                        e.uploaded_by, e.uploaded_at
                 FROM control_evidence ce JOIN evidence e ON e.id = ce.evidence_id
                 WHERE ce.control_id = ?1 AND ce.audit_id = ?2
                 ORDER BY e.uploaded_at DESC, e.id DESC",
                [control_id, audit_id],
            )
            .await?;
        let mut evidence = Vec::new();
        while let Some(row) = rows.next().await? {
            evidence.push(row_to_evidence(&row)?);
        }

        let mut rows = conn
            .query(
                "SELECT r.id, r.summary, r.status, r.priority, r.assignee
                 FROM request_controls rc JOIN requests r ON r.id = rc.request_id
                 WHERE rc.control_id = ?1 AND r.audit_id = ?2 ORDER BY r.id",
                [control_id, audit_id],
            )
            .await?;
        let mut requests = Vec::new();
        while let Some(row) = rows.next().await? {
            requests.push(RequestSummary {
                id: row.get(0)?,
                summary: row.get(1)?,
                status: parse_enum(&row.get::<String>(2)?)?,
                priority: parse_enum(&row.get::<String>(3)?)?,
                assignee: get_opt_string(&row, 4)?,
            });
        }

        Ok(ControlDetail {
            owner_display: owner_display_name(snapshot.owner.as_deref()),
            stale: is_stale(snapshot.freshness_date, today()),
            control,
            snapshot,
            criteria,
            policies,
            evidence,
            requests,
        })
    }

    /// Request rows of an audit.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<RequestListRow>, DatabaseError> {
        let mut w = WhereBuilder::default();
        w.eq("r.audit_id", filter.audit_id.as_str());
        w.text(&["r.id", "r.summary"], filter.q.as_deref());
        if let Some(status) = filter.status {
            w.eq("r.status", status.as_str());
        }
        if let Some(priority) = filter.priority {
            w.eq("r.priority", priority.as_str());
        }
        if let Some(assignee) = filter.assignee.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            w.eq("r.assignee", assignee.to_string());
        }
        let has_evidence = "EXISTS (SELECT 1 FROM request_evidence re WHERE re.request_id = r.id)";
        match filter.has_evidence {
            Some(true) => w.push(has_evidence.to_string()),
            Some(false) => w.push(format!("NOT {has_evidence}")),
            None => {}
        }

        let sql = format!(
            "SELECT r.id, r.summary, r.status, r.priority, r.assignee, r.due_date,
                    (SELECT COUNT(*) FROM request_controls rc WHERE rc.request_id = r.id),
                    (SELECT COUNT(*) FROM request_evidence re WHERE re.request_id = r.id) AS evidence_count
             FROM requests r
             {}
             ORDER BY {}",
            w.clause(),
            filter.sort.order_by()
        );
        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(w.into_params()))
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(RequestListRow {
                id: row.get(0)?,
                summary: row.get(1)?,
                status: parse_enum(&row.get::<String>(2)?)?,
                priority: parse_enum(&row.get::<String>(3)?)?,
                assignee: get_opt_string(&row, 4)?,
                due_date: get_opt_date(&row, 5)?,
                linked_controls: get_count(&row, 6)?,
                evidence_count: get_count(&row, 7)?,
            });
        }
        Ok(out)
    }

    /// A request of `audit_id` with its controls, evidence and comments.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown audit, or a request that does not exist in
    /// that audit.
    pub async fn get_request_detail(
        &self,
        request_id: &str,
        audit_id: &str,
    ) -> Result<RequestDetail, DatabaseError> {
        self.get_audit(audit_id).await?;
        let request = self
            .find_request(request_id)
            .await?
            .filter(|r| r.audit_id == audit_id)
            .ok_or_else(|| DatabaseError::not_found(EntityType::Request, request_id))?;
        let conn = self.db().conn();

        let mut rows = conn
            .query(
                "SELECT c.id, c.name FROM request_controls rc JOIN controls c ON c.id = rc.control_id
                 WHERE rc.request_id = ?1 ORDER BY c.id",
                [request_id],
            )
            .await?;
        let mut controls = Vec::new();
        while let Some(row) = rows.next().await? {
            controls.push(ControlRef {
                id: row.get(0)?,
                name: row.get(1)?,
            });
        }

        let mut rows = conn
            .query(
                "SELECT e.id, e.filename, e.file_path, e.file_type, e.file_size, e.description,
                        e.uploaded_by, e.uploaded_at
                 FROM request_evidence re JOIN evidence e ON e.id = re.evidence_id
                 WHERE re.request_id = ?1
                 ORDER BY e.uploaded_at DESC, e.id DESC",
                [request_id],
            )
            .await?;
        let mut evidence = Vec::new();
        while let Some(row) = rows.next().await? {
            evidence.push(row_to_evidence(&row)?);
        }

        let comments = self.list_comments(request_id).await?;
        Ok(RequestDetail {
            request,
            controls,
            evidence,
            comments,
        })
    }

    /// All evidence, with control and request links as seen from one audit.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_evidence(&self, filter: &EvidenceFilter) -> Result<Vec<EvidenceListRow>, DatabaseError> {
        let mut w = WhereBuilder::default();
        let audit = w.bind(filter.audit_id.as_str());
        w.text(&["e.filename", "e.file_path"], filter.q.as_deref());
        if let Some(file_type) = filter.file_type.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            w.eq("e.file_type", file_type.to_lowercase());
        }
        if let Some(who) = filter.uploaded_by.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            w.eq("e.uploaded_by", who.to_string());
        }
        let linked = format!(
            "EXISTS (SELECT 1 FROM control_evidence ce WHERE ce.evidence_id = e.id AND ce.audit_id = {audit})"
        );
        match filter.has_control_links {
            Some(true) => w.push(linked),
            Some(false) => w.push(format!("NOT {linked}")),
            None => {}
        }

        let sql = format!(
            "SELECT e.id, e.filename, e.file_path, e.file_type, e.file_size, e.description,
                    e.uploaded_by, e.uploaded_at,
                    (SELECT json_group_array(control_id) FROM (
                        SELECT DISTINCT ce.control_id FROM control_evidence ce
                        WHERE ce.evidence_id = e.id AND ce.audit_id = {audit}
                        ORDER BY ce.control_id)),
                    (SELECT json_group_array(id) FROM (
                        SELECT r.id FROM request_evidence re JOIN requests r ON r.id = re.request_id
                        WHERE re.evidence_id = e.id AND r.audit_id = {audit}
                        ORDER BY r.id)),
                    (SELECT COUNT(DISTINCT ce.control_id) FROM control_evidence ce
                     WHERE ce.evidence_id = e.id AND ce.audit_id = {audit}) AS control_link_count
             FROM evidence e
             {}
             ORDER BY {}",
            w.clause(),
            filter.sort.order_by()
        );
        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(w.into_params()))
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            let linked_controls = get_list(&row, 8)?;
            out.push(EvidenceListRow {
                evidence: row_to_evidence(&row)?,
                missing_control_links: linked_controls.is_empty(),
                linked_controls,
                linked_requests: get_list(&row, 9)?,
            });
        }
        Ok(out)
    }

    /// Criteria grouped with their mapped controls and coverage in an audit.
    ///
    /// Ordered by category, subcategory, id. `categories` lists the distinct
    /// categories of the returned criteria.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn criteria_matrix(&self, filter: &CriteriaFilter) -> Result<CriteriaMatrix, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT cr.id, cr.name, cr.category, cr.subcategory,
                        c.id, c.name, cs.implementation_status, cs.testing_status,
                        EXISTS (SELECT 1 FROM control_evidence ce
                                WHERE ce.control_id = c.id AND ce.audit_id = ?1)
                 FROM criteria cr
                 LEFT JOIN control_criteria cc ON cc.criteria_id = cr.id
                 LEFT JOIN controls c ON c.id = cc.control_id
                 LEFT JOIN control_snapshots cs ON cs.control_id = c.id AND cs.audit_id = ?1
                 ORDER BY cr.id, c.id",
                [filter.audit_id.as_str()],
            )
            .await?;

        let mut grouped: Vec<(Criterion, Vec<MatrixControl>)> = Vec::new();
        while let Some(row) = rows.next().await? {
            let criterion = row_to_criterion(&row)?;
            if grouped.last().is_none_or(|(last, _)| last.id != criterion.id) {
                grouped.push((criterion, Vec::new()));
            }
            let Some(control_id) = get_opt_string(&row, 4)? else {
                continue;
            };
            if let Some((_, controls)) = grouped.last_mut() {
                controls.push(MatrixControl {
                    id: control_id,
                    name: row.get(5)?,
                    implementation_status: get_opt_enum(&row, 6)?,
                    testing_status: get_opt_enum(&row, 7)?,
                    has_evidence: get_flag(&row, 8)?,
                });
            }
        }

        let category = filter.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
        let mut criteria: Vec<CriterionCoverage> = grouped
            .into_iter()
            .map(|(criterion, controls)| CriterionCoverage::new(&criterion, controls))
            .filter(|c| matches_text(filter.q.as_deref(), &[&c.id, &c.name]))
            .filter(|c| category.is_none_or(|wanted| c.category == wanted))
            .filter(|c| filter.coverage.is_none_or(|wanted| c.coverage == wanted))
            .collect();
        criteria.sort_by(|a, b| {
            (&a.category, &a.subcategory, &a.id).cmp(&(&b.category, &b.subcategory, &b.id))
        });

        let mut categories: Vec<String> = criteria.iter().map(|c| c.category.clone()).collect();
        categories.sort();
        categories.dedup();
        Ok(CriteriaMatrix {
            criteria,
            categories,
        })
    }

    /// Headline metrics and the attention list for an audit.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown audit.
    pub async fn dashboard(&self, audit_id: &str) -> Result<Dashboard, DatabaseError> {
        self.dashboard_on(audit_id, today()).await
    }

    pub(crate) async fn dashboard_on(
        &self,
        audit_id: &str,
        today: NaiveDate,
    ) -> Result<Dashboard, DatabaseError> {
        let audit = self.get_audit(audit_id).await?;
        let conn = self.db().conn();
        let today = format_date(today);

        let mut rows = conn
            .query(
                "SELECT COUNT(*),
                        SUM(cs.implementation_status IN ('Completed', 'Effective')),
                        SUM(cs.testing_status IN ('Submitted to Auditor', 'Effective')),
                        SUM(cs.freshness_date IS NOT NULL AND cs.freshness_date < ?2),
                        SUM(EXISTS (SELECT 1 FROM control_evidence ce
                                    WHERE ce.control_id = cs.control_id AND ce.audit_id = cs.audit_id)),
                        (SELECT COUNT(*) FROM requests r WHERE r.audit_id = ?1 AND r.status != 'Closed')
                 FROM control_snapshots cs
                 JOIN controls c ON c.id = cs.control_id
                 WHERE cs.audit_id = ?1 AND c.kind = 'control'",
                [audit_id, today.as_str()],
            )
            .await?;
        let metrics = match rows.next().await? {
            Some(row) => DashboardMetrics {
                total_controls: get_count(&row, 0)?,
                implementation_done: get_count(&row, 1)?,
                testing_done: get_count(&row, 2)?,
                stale_controls: get_count(&row, 3)?,
                controls_with_evidence: get_count(&row, 4)?,
                open_requests: get_count(&row, 5)?,
            },
            None => DashboardMetrics::default(),
        };

        let mut rows = conn
            .query(
                "SELECT * FROM (
                    SELECT c.id, c.name, cs.freshness_date,
                           (SELECT COUNT(DISTINCT ce.evidence_id) FROM control_evidence ce
                            WHERE ce.control_id = c.id AND ce.audit_id = cs.audit_id) AS evidence_count,
                           cs.implementation_status, cs.testing_status,
                           (cs.freshness_date IS NOT NULL AND cs.freshness_date < ?2) AS stale
                    FROM control_snapshots cs
                    JOIN controls c ON c.id = cs.control_id
                    WHERE cs.audit_id = ?1 AND c.kind = 'control'
                 )
                 WHERE evidence_count = 0 OR stale
                 ORDER BY evidence_count != 0, freshness_date IS NULL, freshness_date, id
                 LIMIT ?3",
                libsql::params![audit_id, today.as_str(), i64::from(ATTENTION_LIMIT)],
            )
            .await?;
        let mut attention = Vec::new();
        while let Some(row) = rows.next().await? {
            attention.push(AttentionRow {
                control_id: row.get(0)?,
                name: row.get(1)?,
                freshness_date: get_opt_date(&row, 2)?,
                evidence_count: get_count(&row, 3)?,
                implementation_status: parse_enum(&row.get::<String>(4)?)?,
                testing_status: parse_enum(&row.get::<String>(5)?)?,
                stale: get_flag(&row, 6)?,
            });
        }

        Ok(Dashboard {
            audit,
            metrics,
            attention,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::repos::catalog::NewControl;
    use crate::repos::evidence::NewEvidence;
    use crate::repos::request::NewRequest;
    use crate::test_support::helpers::{seed_closed_and_active, seed_controls, test_service};
    use crate::updates::snapshot::SnapshotUpdateBuilder;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn attach(svc: &TrustHubService, audit_id: &str, control_id: &str) {
        svc.create_evidence(NewEvidence {
            audit_id: Some(audit_id.into()),
            filename: format!("{control_id}.pdf"),
            file_path: format!("/e/{control_id}.pdf"),
            control_ids: vec![control_id.into()],
            ..Default::default()
        })
        .await
        .unwrap();
    }

    #[rstest]
    #[case(None, true)]
    #[case(Some("  "), true)]
    #[case(Some("cc1"), true)]
    #[case(Some("zzz"), false)]
    #[case(Some("INTEGRITY"), true)]
    #[case(Some("überwachung"), false)]
    fn text_matching(#[case] needle: Option<&str>, #[case] expected: bool) {
        assert_eq!(matches_text(needle, &["CC1.1", "Integrity", "Überwachung"]), expected);
    }

    #[tokio::test]
    async fn controls_listing_computes_counts_and_staleness() {
        let svc = test_service().await;
        seed_closed_and_active(&svc).await;
        svc.update_snapshot(
            "CTL-001",
            "FY25",
            SnapshotUpdateBuilder::new()
                .freshness_date(Some(day(2025, 6, 14)))
                .owner(Some("Jane (jane@x.io)".into()))
                .build(),
        )
        .await
        .unwrap();
        attach(&svc, "FY25", "CTL-002").await;

        let rows = svc
            .list_controls_on(
                &ControlFilter {
                    audit_id: "FY25".into(),
                    ..Default::default()
                },
                day(2025, 6, 15),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].stale);
        assert_eq!(rows[0].owner_display, "Jane");
        assert_eq!(rows[1].evidence_count, 1);
        assert_eq!(rows[1].owner_display, "Unassigned");

        let with_evidence = svc
            .list_controls_on(
                &ControlFilter {
                    audit_id: "FY25".into(),
                    has_evidence: Some(true),
                    ..Default::default()
                },
                day(2025, 6, 15),
            )
            .await
            .unwrap();
        assert_eq!(with_evidence.len(), 1);
        assert_eq!(with_evidence[0].id, "CTL-002");
    }

    #[tokio::test]
    async fn controls_listing_skips_policy_markers_and_unknown_audits() {
        let svc = test_service().await;
        seed_closed_and_active(&svc).await;
        svc.create_control(NewControl {
            kind: th_core::enums::ControlKind::Policy,
            ..NewControl::new("POL-MARK", "Marker")
        })
        .await
        .unwrap();

        let rows = svc
            .list_controls(&ControlFilter {
                audit_id: "FY25".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(rows.iter().all(|r| r.id != "POL-MARK"));

        let none = svc
            .list_controls(&ControlFilter {
                audit_id: "FY99".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn control_detail_collects_audit_scoped_links() {
        let svc = test_service().await;
        seed_closed_and_active(&svc).await;
        attach(&svc, "FY25", "CTL-001").await;
        svc.create_request(NewRequest {
            id: "REQ-1".into(),
            audit_id: "FY25".into(),
            summary: "Access".into(),
            control_ids: vec!["CTL-001".into()],
            ..Default::default()
        })
        .await
        .unwrap();

        let detail = svc.get_control_detail("CTL-001", "FY25").await.unwrap();
        assert_eq!(detail.evidence.len(), 1);
        assert_eq!(detail.requests.len(), 1);
        assert_eq!(detail.owner_display, "Unassigned");

        let prior = svc.get_control_detail("CTL-001", "FY24").await.unwrap();
        assert!(prior.evidence.is_empty());
        assert!(prior.requests.is_empty());

        let err = svc.get_control_detail("CTL-001", "FY99").await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { entity: EntityType::Audit, .. }));
    }

    #[tokio::test]
    async fn request_detail_requires_matching_audit() {
        let svc = test_service().await;
        seed_closed_and_active(&svc).await;
        svc.create_request(NewRequest {
            id: "REQ-1".into(),
            audit_id: "FY25".into(),
            summary: "Access".into(),
            ..Default::default()
        })
        .await
        .unwrap();

        assert_eq!(svc.get_request_detail("REQ-1", "FY25").await.unwrap().request.id, "REQ-1");
        let err = svc.get_request_detail("REQ-1", "FY24").await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { entity: EntityType::Request, .. }));
    }

    #[tokio::test]
    async fn evidence_listing_flags_missing_control_links() {
        let svc = test_service().await;
        seed_closed_and_active(&svc).await;
        attach(&svc, "FY25", "CTL-001").await;
        svc.create_evidence(NewEvidence {
            filename: "loose.txt".into(),
            file_path: "/e/loose.txt".into(),
            ..Default::default()
        })
        .await
        .unwrap();

        let rows = svc
            .list_evidence(&EvidenceFilter {
                audit_id: "FY25".into(),
                sort: EvidenceSort::Filename,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].evidence.filename, "CTL-001.pdf");
        assert_eq!(rows[0].linked_controls, vec!["CTL-001"]);
        assert!(!rows[0].missing_control_links);
        assert!(rows[1].missing_control_links);

        let prior = svc
            .list_evidence(&EvidenceFilter {
                audit_id: "FY24".into(),
                has_control_links: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(prior.is_empty());
    }

    #[tokio::test]
    async fn evidence_listing_keeps_ids_containing_commas() {
        let svc = test_service().await;
        seed_closed_and_active(&svc).await;
        seed_controls(&svc, &["CC6.1,A"]).await;
        svc.create_request(NewRequest {
            id: "REQ-1,b".into(),
            audit_id: "FY25".into(),
            summary: "Access review export".into(),
            control_ids: vec!["CC6.1,A".into()],
            ..Default::default()
        })
        .await
        .unwrap();
        svc.create_evidence(NewEvidence {
            audit_id: Some("FY25".into()),
            filename: "export.csv".into(),
            file_path: "/e/export.csv".into(),
            request_ids: vec!["REQ-1,b".into()],
            ..Default::default()
        })
        .await
        .unwrap();

        let rows = svc
            .list_evidence(&EvidenceFilter {
                audit_id: "FY25".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].linked_controls, vec!["CC6.1,A"]);
        assert_eq!(rows[0].linked_requests, vec!["REQ-1,b"]);
        assert!(!rows[0].missing_control_links);
    }

    #[tokio::test]
    async fn matrix_classifies_and_filters_coverage() {
        let svc = test_service().await;
        seed_closed_and_active(&svc).await;
        for (id, category) in [("CC1.1", Some("Control Environment")), ("CC6.1", Some("Logical Access")), ("A1.1", None)] {
            svc.create_criterion(Criterion {
                id: id.into(),
                name: format!("{id} name"),
                category: category.map(String::from),
                subcategory: None,
            })
            .await
            .unwrap();
        }
        svc.map_control_criterion("CTL-001", "CC1.1").await.unwrap();
        svc.map_control_criterion("CTL-001", "CC6.1").await.unwrap();
        svc.map_control_criterion("CTL-002", "CC6.1").await.unwrap();
        attach(&svc, "FY25", "CTL-001").await;

        let matrix = svc
            .criteria_matrix(&CriteriaFilter {
                audit_id: "FY25".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let coverage: Vec<(String, CoverageState)> = matrix
            .criteria
            .iter()
            .map(|c| (c.id.clone(), c.coverage))
            .collect();
        assert_eq!(
            coverage,
            vec![
                ("CC1.1".to_string(), CoverageState::Covered),
                ("CC6.1".to_string(), CoverageState::Partial),
                ("A1.1".to_string(), CoverageState::Uncovered),
            ]
        );
        assert_eq!(
            matrix.categories,
            vec!["Control Environment", "Logical Access", "Uncategorized"]
        );

        let partial = svc
            .criteria_matrix(&CriteriaFilter {
                audit_id: "FY25".into(),
                coverage: Some(CoverageState::Partial),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(partial.criteria.len(), 1);
        assert_eq!(partial.categories, vec!["Logical Access"]);

        let uncategorized = svc
            .criteria_matrix(&CriteriaFilter {
                audit_id: "FY25".into(),
                category: Some("Uncategorized".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(uncategorized.criteria[0].id, "A1.1");
    }

    #[tokio::test]
    async fn dashboard_metrics_and_attention_order() {
        let svc = test_service().await;
        seed_controls(&svc, &["CTL-003"]).await;
        seed_closed_and_active(&svc).await;
        let today = day(2025, 6, 15);

        svc.update_snapshot(
            "CTL-001",
            "FY25",
            SnapshotUpdateBuilder::new()
                .implementation_status(ImplementationStatus::Effective)
                .testing_status(TestingStatus::SubmittedToAuditor)
                .freshness_date(Some(day(2025, 1, 1)))
                .build(),
        )
        .await
        .unwrap();
        svc.update_snapshot(
            "CTL-002",
            "FY25",
            SnapshotUpdateBuilder::new()
                .testing_status(TestingStatus::InProgress)
                .freshness_date(Some(day(2025, 12, 31)))
                .build(),
        )
        .await
        .unwrap();
        attach(&svc, "FY25", "CTL-001").await;
        svc.create_request(NewRequest {
            id: "REQ-1".into(),
            audit_id: "FY25".into(),
            summary: "Open one".into(),
            ..Default::default()
        })
        .await
        .unwrap();

        let dash = svc.dashboard_on("FY25", today).await.unwrap();
        assert_eq!(
            dash.metrics,
            DashboardMetrics {
                total_controls: 3,
                implementation_done: 1,
                testing_done: 1,
                stale_controls: 1,
                controls_with_evidence: 1,
                open_requests: 1,
            }
        );
        let ids: Vec<&str> = dash.attention.iter().map(|a| a.control_id.as_str()).collect();
        assert_eq!(ids, vec!["CTL-002", "CTL-003", "CTL-001"]);
        assert!(dash.attention[2].stale);

        let err = svc.dashboard("FY99").await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
