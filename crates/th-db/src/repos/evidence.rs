//! Evidence repository.
//!
//! Evidence rows are global. Links to controls are scoped to an audit and
//! gated; links to requests are flat and inherit the request's audit. Adding
//! evidence to a request also links it to every control the request is
//! linked to at that moment.

use std::collections::BTreeSet;

use chrono::Utc;
use tracing::{debug, info, warn};

use th_core::activity_detail::LinkedDetail;
use th_core::entities::{Evidence, Request};
use th_core::enums::{ActivityAction, EntityType};
use th_core::ids::PREFIX_EVIDENCE;

use crate::error::DatabaseError;
use crate::gateway::recheck_writable;
use crate::helpers::{get_opt_string, parse_datetime, require_non_blank, to_detail};
use crate::repos::activity::Activity;
use crate::service::{TrustHubService, finish};
use crate::updates::evidence::EvidenceUpdate;

pub(crate) const SELECT_COLS: &str =
    "id, filename, file_path, file_type, file_size, description, uploaded_by, uploaded_at";

/// Input for [`TrustHubService::create_evidence`].
#[derive(Debug, Clone, Default)]
pub struct NewEvidence {
    /// Required whenever `control_ids` or `request_ids` is non-empty.
    pub audit_id: Option<String>,
    pub filename: String,
    pub file_path: String,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    pub description: Option<String>,
    pub uploaded_by: Option<String>,
    pub control_ids: Vec<String>,
    pub request_ids: Vec<String>,
}

pub(crate) fn row_to_evidence(row: &libsql::Row) -> Result<Evidence, DatabaseError> {
    Ok(Evidence {
        id: row.get(0)?,
        filename: row.get(1)?,
        file_path: row.get(2)?,
        file_type: row.get(3)?,
        file_size: row.get::<Option<i64>>(4)?,
        description: get_opt_string(row, 5)?,
        uploaded_by: row.get(6)?,
        uploaded_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

fn resolve_file_type(explicit: Option<&str>, filename: &str) -> String {
    explicit
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map_or_else(|| Evidence::infer_file_type(filename), str::to_lowercase)
}

async fn link_control(
    conn: &libsql::Connection,
    control_id: &str,
    evidence_id: &str,
    audit_id: &str,
) -> Result<bool, DatabaseError> {
    Ok(conn
        .execute(
            "INSERT OR IGNORE INTO control_evidence (control_id, evidence_id, audit_id)
             VALUES (?1, ?2, ?3)",
            [control_id, evidence_id, audit_id],
        )
        .await?
        > 0)
}

impl TrustHubService {
    /// Register an evidence file and its links in one transaction.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank filename or path, or links without an audit;
    /// gateway errors for the audit; `NotFound` for an unknown control;
    /// `Integrity` for an unknown request or one from another audit.
    pub async fn create_evidence(&self, input: NewEvidence) -> Result<Evidence, DatabaseError> {
        let filename = require_non_blank("filename", &input.filename)?.to_string();
        let file_path = require_non_blank("file_path", &input.file_path)?.to_string();
        let has_links = !input.control_ids.is_empty() || !input.request_ids.is_empty();
        let audit_id = input
            .audit_id
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty());
        if has_links && audit_id.is_none() {
            return Err(DatabaseError::Validation(
                "audit id is required when linking evidence".to_string(),
            ));
        }
        if let Some(audit_id) = audit_id {
            self.ensure_audit_writable(audit_id).await?;
        }
        self.ensure_controls_exist(&input.control_ids).await?;

        let mut requests: Vec<Request> = Vec::with_capacity(input.request_ids.len());
        for request_id in &input.request_ids {
            let request = self.find_request(request_id).await?.ok_or_else(|| {
                DatabaseError::Integrity(format!("request '{request_id}' does not exist"))
            })?;
            if Some(request.audit_id.as_str()) != audit_id {
                warn!(request_id, request_audit = %request.audit_id, "evidence link rejected: audit mismatch");
                return Err(DatabaseError::Integrity(format!(
                    "request '{request_id}' belongs to audit '{}'",
                    request.audit_id
                )));
            }
            requests.push(request);
        }

        // Pairs of (control, audit) the evidence ends up linked to.
        let mut control_links = BTreeSet::new();
        if let Some(audit_id) = audit_id {
            for control_id in &input.control_ids {
                control_links.insert((control_id.clone(), audit_id.to_string()));
            }
        }
        for request in &requests {
            for control_id in self.request_control_ids(&request.id).await? {
                control_links.insert((control_id, request.audit_id.clone()));
            }
        }

        let file_type = resolve_file_type(input.file_type.as_deref(), &filename);
        let uploaded_by = input
            .uploaded_by
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.actor().to_string());
        let description = input.description.filter(|d| !d.trim().is_empty());
        let file_size = input.file_size;
        let request_ids = &input.request_ids;

        let tx = self.begin().await?;
        let result = async {
            if let Some(audit_id) = audit_id {
                recheck_writable(&tx, audit_id).await?;
            }
            let evidence = Evidence {
                id: crate::generate_id(&tx, PREFIX_EVIDENCE).await?,
                filename,
                file_path,
                file_type,
                file_size,
                description,
                uploaded_by,
                uploaded_at: Utc::now(),
            };
            tx.execute(
                &format!("INSERT INTO evidence ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                libsql::params![
                    evidence.id.as_str(),
                    evidence.filename.as_str(),
                    evidence.file_path.as_str(),
                    evidence.file_type.as_str(),
                    evidence.file_size,
                    evidence.description.as_deref(),
                    evidence.uploaded_by.as_str(),
                    evidence.uploaded_at.to_rfc3339()
                ],
            )
            .await?;
            for request in &requests {
                tx.execute(
                    "INSERT OR IGNORE INTO request_evidence (request_id, evidence_id) VALUES (?1, ?2)",
                    [request.id.as_str(), evidence.id.as_str()],
                )
                .await?;
            }
            for (control_id, link_audit) in &control_links {
                link_control(&tx, control_id, &evidence.id, link_audit).await?;
            }
            let detail = serde_json::json!({
                "audit_id": audit_id,
                "control_links": control_links.iter().map(|(c, _)| c).collect::<Vec<_>>(),
                "request_ids": request_ids,
            });
            self.record_activity(
                &tx,
                Activity::new(audit_id, EntityType::Evidence, &evidence.id, ActivityAction::Created)
                    .with_detail(detail),
            )
            .await?;
            Ok::<_, DatabaseError>(evidence)
        }
        .await;
        let evidence = finish(tx, result).await?;

        info!(
            evidence_id = %evidence.id,
            controls = control_links.len(),
            requests = requests.len(),
            "evidence added"
        );
        Ok(evidence)
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn find_evidence(&self, id: &str) -> Result<Option<Evidence>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM evidence WHERE id = ?1"), [id])
            .await?;
        rows.next().await?.map(|row| row_to_evidence(&row)).transpose()
    }

    /// # Errors
    ///
    /// `NotFound` when no evidence has this ID.
    pub async fn get_evidence(&self, id: &str) -> Result<Evidence, DatabaseError> {
        self.find_evidence(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(EntityType::Evidence, id))
    }

    /// Edit global evidence fields. Not gated: evidence outlives audits.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty patch or a blank filename, path or file
    /// type, `NotFound` for unknown evidence.
    pub async fn update_evidence(
        &self,
        evidence_id: &str,
        update: EvidenceUpdate,
    ) -> Result<Evidence, DatabaseError> {
        if let Some(ref filename) = update.filename {
            require_non_blank("filename", filename)?;
        }
        if let Some(ref file_path) = update.file_path {
            require_non_blank("file_path", file_path)?;
        }
        if let Some(ref file_type) = update.file_type {
            require_non_blank("file_type", file_type)?;
        }
        let set = update.set_clause();
        if set.is_empty() {
            return Err(DatabaseError::Validation("no fields to update".to_string()));
        }
        self.get_evidence(evidence_id).await?;
        let (sql, params) = set.into_statement("evidence", &[("id", evidence_id)]);

        let tx = self.begin().await?;
        let result = async {
            tx.execute(&sql, libsql::params_from_iter(params)).await?;
            self.record_activity(
                &tx,
                Activity::new(None, EntityType::Evidence, evidence_id, ActivityAction::Updated)
                    .with_detail(to_detail(&update)?),
            )
            .await?;
            Ok::<_, DatabaseError>(())
        }
        .await;
        finish(tx, result).await?;

        self.get_evidence(evidence_id).await
    }

    /// Link existing evidence to a control within an audit.
    ///
    /// Returns `false` when the link already existed.
    ///
    /// # Errors
    ///
    /// Gateway errors for the audit, `NotFound` for unknown evidence or
    /// control.
    pub async fn relink_evidence_control(
        &self,
        audit_id: &str,
        control_id: &str,
        evidence_id: &str,
    ) -> Result<bool, DatabaseError> {
        self.ensure_audit_writable(audit_id).await?;
        self.get_evidence(evidence_id).await?;
        self.get_control(control_id).await?;

        let tx = self.begin().await?;
        let result = async {
            recheck_writable(&tx, audit_id).await?;
            let inserted = link_control(&tx, control_id, evidence_id, audit_id).await?;
            let detail = LinkedDetail {
                target_type: EntityType::Control.as_str().to_string(),
                target_id: control_id.to_string(),
                inserted,
            };
            self.record_activity(
                &tx,
                Activity::new(Some(audit_id), EntityType::Evidence, evidence_id, ActivityAction::Linked)
                    .with_detail(to_detail(&detail)?),
            )
            .await?;
            Ok::<_, DatabaseError>(inserted)
        }
        .await;
        let inserted = finish(tx, result).await?;

        debug!(audit_id, control_id, evidence_id, inserted, "evidence relinked");
        Ok(inserted)
    }

    /// Controls an evidence file is linked to within an audit.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn evidence_control_ids(
        &self,
        evidence_id: &str,
        audit_id: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT control_id FROM control_evidence
                 WHERE evidence_id = ?1 AND audit_id = ?2 ORDER BY control_id",
                [evidence_id, audit_id],
            )
            .await?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<String>(0)?);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::repos::request::NewRequest;
    use crate::test_support::helpers::{seed_closed_and_active, test_service};
    use crate::updates::evidence::EvidenceUpdateBuilder;

    fn file(name: &str) -> NewEvidence {
        NewEvidence {
            filename: name.into(),
            file_path: format!("/evidence/{name}"),
            ..Default::default()
        }
    }

    #[rstest]
    #[case(Some(" XLSX "), "x.pdf", "xlsx")]
    #[case(Some(""), "x.pdf", "pdf")]
    #[case(None, "noext", "unknown")]
    fn file_type_prefers_explicit(
        #[case] explicit: Option<&str>,
        #[case] filename: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(resolve_file_type(explicit, filename), expected);
    }

    #[tokio::test]
    async fn global_evidence_defaults_uploader() {
        let svc = test_service().await;
        let evidence = svc.create_evidence(file("policy.PDF")).await.unwrap();
        assert!(evidence.id.starts_with("evd-"));
        assert_eq!(evidence.file_type, "pdf");
        assert_eq!(evidence.uploaded_by, "Tester");
        assert_eq!(svc.get_evidence(&evidence.id).await.unwrap(), evidence);
    }

    #[tokio::test]
    async fn links_require_audit() {
        let svc = test_service().await;
        seed_closed_and_active(&svc).await;
        let err = svc
            .create_evidence(NewEvidence {
                control_ids: vec!["CTL-001".into()],
                ..file("a.pdf")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
    }

    #[tokio::test]
    async fn request_link_auto_links_request_controls() {
        let svc = test_service().await;
        seed_closed_and_active(&svc).await;
        svc.create_request(NewRequest {
            id: "REQ-1".into(),
            audit_id: "FY25".into(),
            summary: "Access".into(),
            control_ids: vec!["CTL-002".into()],
            ..Default::default()
        })
        .await
        .unwrap();

        let evidence = svc
            .create_evidence(NewEvidence {
                audit_id: Some("FY25".into()),
                control_ids: vec!["CTL-001".into()],
                request_ids: vec!["REQ-1".into()],
                ..file("a.pdf")
            })
            .await
            .unwrap();

        assert_eq!(
            svc.evidence_control_ids(&evidence.id, "FY25").await.unwrap(),
            vec!["CTL-001", "CTL-002"]
        );
        assert!(svc.evidence_control_ids(&evidence.id, "FY24").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn later_request_control_is_not_backfilled() {
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
        let evidence = svc
            .create_evidence(NewEvidence {
                audit_id: Some("FY25".into()),
                request_ids: vec!["REQ-1".into()],
                ..file("a.pdf")
            })
            .await
            .unwrap();

        svc.link_request_control("REQ-1", "CTL-001").await.unwrap();
        assert!(svc.evidence_control_ids(&evidence.id, "FY25").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn foreign_request_is_integrity_error() {
        let svc = test_service().await;
        seed_closed_and_active(&svc).await;
        let err = svc
            .create_evidence(NewEvidence {
                audit_id: Some("FY25".into()),
                request_ids: vec!["REQ-404".into()],
                ..file("a.pdf")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Integrity(_)));

        let mut rows = svc.db().conn().query("SELECT COUNT(*) FROM evidence", ()).await.unwrap();
        let n = rows.next().await.unwrap().unwrap().get::<i64>(0).unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn closed_audit_blocks_linked_upload() {
        let svc = test_service().await;
        seed_closed_and_active(&svc).await;
        let err = svc
            .create_evidence(NewEvidence {
                audit_id: Some("FY24".into()),
                control_ids: vec!["CTL-001".into()],
                ..file("a.pdf")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::AuditClosed { .. }));
    }

    #[tokio::test]
    async fn relink_is_idempotent_and_gated() {
        let svc = test_service().await;
        seed_closed_and_active(&svc).await;
        let evidence = svc.create_evidence(file("a.pdf")).await.unwrap();

        assert!(svc.relink_evidence_control("FY25", "CTL-001", &evidence.id).await.unwrap());
        assert!(!svc.relink_evidence_control("FY25", "CTL-001", &evidence.id).await.unwrap());
        assert_eq!(
            svc.evidence_control_ids(&evidence.id, "FY25").await.unwrap(),
            vec!["CTL-001"]
        );

        let err = svc
            .relink_evidence_control("FY24", "CTL-001", &evidence.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::AuditClosed { .. }));
        let err = svc
            .relink_evidence_control("FY25", "CTL-001", "evd-00000000")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { entity: EntityType::Evidence, .. }));
    }

    #[tokio::test]
    async fn update_is_ungated() {
        let svc = test_service().await;
        seed_closed_and_active(&svc).await;
        let evidence = svc
            .create_evidence(NewEvidence {
                audit_id: Some("FY25".into()),
                control_ids: vec!["CTL-001".into()],
                ..file("a.pdf")
            })
            .await
            .unwrap();
        svc.close_audit(None).await.unwrap();

        let updated = svc
            .update_evidence(
                &evidence.id,
                EvidenceUpdateBuilder::new()
                    .description(Some("Q3 access review".into()))
                    .file_type("DOCX")
                    .build(),
            )
            .await
            .unwrap();
        assert_eq!(updated.description.as_deref(), Some("Q3 access review"));
        assert_eq!(updated.file_type, "docx");
    }

    #[tokio::test]
    async fn update_normalizes_file_type_like_create() {
        let svc = test_service().await;
        seed_closed_and_active(&svc).await;
        let evidence = svc.create_evidence(file("policy.docx")).await.unwrap();

        let updated = svc
            .update_evidence(&evidence.id, EvidenceUpdateBuilder::new().file_type(" PDF ").build())
            .await
            .unwrap();
        assert_eq!(updated.file_type, "pdf");

        let pdfs = svc
            .list_evidence(&crate::repos::coverage::EvidenceFilter {
                audit_id: "FY25".into(),
                file_type: Some("pdf".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(pdfs.len(), 1);

        let err = svc
            .update_evidence(&evidence.id, EvidenceUpdateBuilder::new().file_type("  ").build())
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
        assert_eq!(svc.get_evidence(&evidence.id).await.unwrap().file_type, "pdf");
    }
}
