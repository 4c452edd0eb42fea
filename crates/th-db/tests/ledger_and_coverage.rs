//! Request/evidence ledger and coverage query integration tests.

use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use th_core::coverage::CoverageState;
use th_core::entities::Criterion;
use th_core::enums::{AuditStatus, EntityType, Priority, RelationshipType, RequestStatus};
use th_db::error::DatabaseError;
use th_db::repos::audit::{ImportedAudit, NewAudit};
use th_db::repos::catalog::NewControl;
use th_db::repos::comment::NewComment;
use th_db::repos::coverage::{
    ControlFilter, ControlSort, CriteriaFilter, EvidenceFilter, RequestFilter, RequestSort,
};
use th_db::repos::evidence::NewEvidence;
use th_db::repos::policy::{NewPolicy, PolicyFilter};
use th_db::repos::request::NewRequest;
use th_db::service::TrustHubService;
use th_db::updates::policy::{PolicyLink, PolicyUpdateBuilder};
use th_db::updates::snapshot::SnapshotUpdateBuilder;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Controls CTL-001..CTL-003, closed FY24, active FY25.
async fn seeded() -> TrustHubService {
    let svc = TrustHubService::new_local(":memory:", "Ops").await.unwrap();
    for (id, name) in [("CTL-001", "Access reviews"), ("CTL-002", "Backups"), ("CTL-003", "Change management")] {
        svc.create_control(NewControl::new(id, name)).await.unwrap();
    }
    svc.import_audit(ImportedAudit {
        id: "FY24".into(),
        name: "FY24".into(),
        status: AuditStatus::Closed,
        period_start: None,
        period_end: None,
        auditor_firm: None,
        closed_at: None,
    })
    .await
    .unwrap();
    svc.start_audit(NewAudit {
        id: "FY25".into(),
        name: "FY25".into(),
        ..Default::default()
    })
    .await
    .unwrap();
    svc
}

fn request(id: &str, controls: &[&str]) -> NewRequest {
    NewRequest {
        id: id.into(),
        audit_id: "FY25".into(),
        summary: format!("Provide {id}"),
        control_ids: controls.iter().map(|c| (*c).to_string()).collect(),
        ..Default::default()
    }
}

async fn table_count(svc: &TrustHubService, sql: &str) -> i64 {
    let mut rows = svc.db().conn().query(sql, ()).await.unwrap();
    rows.next().await.unwrap().unwrap().get::<i64>(0).unwrap()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn request_with_unknown_control_persists_nothing() {
    let svc = seeded().await;
    let err = svc
        .create_request(request("REQ-1", &["CTL-001", "CTL-404"]))
        .await
        .unwrap_err();

    assert!(matches!(err, DatabaseError::NotFound { entity: EntityType::Control, .. }));
    assert!(svc.find_request("REQ-1").await.unwrap().is_none());
    assert_eq!(table_count(&svc, "SELECT COUNT(*) FROM request_controls").await, 0);
}

#[tokio::test]
async fn deleting_a_request_cascades_but_keeps_evidence() {
    let svc = seeded().await;
    svc.create_request(request("REQ-1", &["CTL-001"])).await.unwrap();
    svc.create_comment(NewComment {
        request_id: "REQ-1".into(),
        body: "Uploaded the export".into(),
        ..Default::default()
    })
    .await
    .unwrap();
    let evidence = svc
        .create_evidence(NewEvidence {
            audit_id: Some("FY25".into()),
            filename: "export.csv".into(),
            file_path: "/evidence/export.csv".into(),
            request_ids: vec!["REQ-1".into()],
            ..Default::default()
        })
        .await
        .unwrap();

    svc.delete_request("REQ-1").await.unwrap();

    for table in ["request_evidence", "request_controls", "comments", "requests"] {
        let n = table_count(&svc, &format!("SELECT COUNT(*) FROM {table}")).await;
        assert_eq!(n, 0, "{table}");
    }
    assert_eq!(svc.get_evidence(&evidence.id).await.unwrap().filename, "export.csv");
    // control links stay with the audit
    assert_eq!(
        svc.evidence_control_ids(&evidence.id, "FY25").await.unwrap(),
        vec!["CTL-001"]
    );
}

#[tokio::test]
async fn requests_in_a_closed_audit_are_locked() {
    let svc = seeded().await;
    svc.create_request(request("REQ-1", &[])).await.unwrap();
    svc.close_audit(Some("FY25")).await.unwrap();

    let err = svc.delete_request("REQ-1").await.unwrap_err();
    assert!(matches!(err, DatabaseError::AuditClosed { .. }));
    let err = svc
        .create_comment(NewComment {
            request_id: "REQ-1".into(),
            body: "late".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::AuditClosed { .. }));
    assert!(svc.find_request("REQ-1").await.unwrap().is_some());
}

// ---------------------------------------------------------------------------
// Evidence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn request_evidence_links_to_request_controls_in_that_audit_only() {
    let svc = seeded().await;
    svc.create_request(request("REQ-1", &["CTL-001", "CTL-002"])).await.unwrap();

    let evidence = svc
        .create_evidence(NewEvidence {
            audit_id: Some("FY25".into()),
            filename: "users.xlsx".into(),
            file_path: "/evidence/users.xlsx".into(),
            request_ids: vec!["REQ-1".into()],
            ..Default::default()
        })
        .await
        .unwrap();

    let detail = svc.get_request_detail("REQ-1", "FY25").await.unwrap();
    assert_eq!(detail.evidence.len(), 1);
    assert_eq!(
        svc.evidence_control_ids(&evidence.id, "FY25").await.unwrap(),
        vec!["CTL-001", "CTL-002"]
    );
    assert!(svc.evidence_control_ids(&evidence.id, "FY24").await.unwrap().is_empty());
    assert_eq!(
        table_count(&svc, "SELECT COUNT(*) FROM control_evidence WHERE audit_id != 'FY25'").await,
        0
    );
}

#[tokio::test]
async fn later_request_controls_do_not_backfill_evidence() {
    let svc = seeded().await;
    svc.create_request(request("REQ-1", &["CTL-001"])).await.unwrap();
    let evidence = svc
        .create_evidence(NewEvidence {
            audit_id: Some("FY25".into()),
            filename: "a.pdf".into(),
            file_path: "/a.pdf".into(),
            request_ids: vec!["REQ-1".into()],
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(svc.link_request_control("REQ-1", "CTL-003").await.unwrap());

    assert_eq!(
        svc.evidence_control_ids(&evidence.id, "FY25").await.unwrap(),
        vec!["CTL-001"]
    );
}

#[tokio::test]
async fn relinking_is_idempotent_and_gated() {
    let svc = seeded().await;
    let evidence = svc
        .create_evidence(NewEvidence {
            filename: "policy.pdf".into(),
            file_path: "/policy.pdf".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(svc.relink_evidence_control("FY25", "CTL-002", &evidence.id).await.unwrap());
    assert!(!svc.relink_evidence_control("FY25", "CTL-002", &evidence.id).await.unwrap());
    assert_eq!(
        table_count(&svc, "SELECT COUNT(*) FROM control_evidence").await,
        1
    );

    let err = svc
        .relink_evidence_control("FY24", "CTL-002", &evidence.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::AuditClosed { .. }));
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

#[tokio::test]
async fn policy_relationships_are_replaced_wholesale() {
    let svc = seeded().await;
    let policy = svc
        .create_policy(NewPolicy {
            name: "Information Security".into(),
            controls: vec![
                PolicyLink::new("CTL-001", RelationshipType::Fulfills),
                PolicyLink::new("CTL-002", RelationshipType::Governs),
            ],
            ..Default::default()
        })
        .await
        .unwrap();

    svc.update_policy(
        &policy.id,
        PolicyUpdateBuilder::new()
            .controls(vec![PolicyLink::new("CTL-003", RelationshipType::RequiresAcknowledgement)])
            .build(),
    )
    .await
    .unwrap();

    let links: Vec<(String, RelationshipType)> = svc
        .policy_links(&policy.id)
        .await
        .unwrap()
        .into_iter()
        .map(|l| (l.control_id, l.relationship_type))
        .collect();
    assert_eq!(
        links,
        vec![("CTL-003".to_string(), RelationshipType::RequiresAcknowledgement)]
    );

    let err = svc
        .update_policy(
            &policy.id,
            PolicyUpdateBuilder::new()
                .name("Renamed")
                .controls(vec![PolicyLink::new("CTL-404", RelationshipType::Governs)])
                .build(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::NotFound { .. }));
    assert_eq!(svc.get_policy(&policy.id).await.unwrap().name, "Information Security");
    assert_eq!(svc.policy_links(&policy.id).await.unwrap().len(), 1);

    let listed = svc
        .list_policies(&PolicyFilter {
            relationship_type: Some(RelationshipType::RequiresAcknowledgement),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
}

// ---------------------------------------------------------------------------
// Coverage
// ---------------------------------------------------------------------------

#[tokio::test]
async fn criterion_with_mixed_evidence_is_partial() {
    let svc = seeded().await;
    svc.create_criterion(Criterion {
        id: "CC1.1".into(),
        name: "Integrity and ethical values".into(),
        category: Some("Control Environment".into()),
        subcategory: None,
    })
    .await
    .unwrap();
    svc.map_control_criterion("CTL-001", "CC1.1").await.unwrap();
    svc.map_control_criterion("CTL-002", "CC1.1").await.unwrap();
    svc.create_evidence(NewEvidence {
        audit_id: Some("FY25".into()),
        filename: "code-of-conduct.pdf".into(),
        file_path: "/coc.pdf".into(),
        control_ids: vec!["CTL-001".into()],
        ..Default::default()
    })
    .await
    .unwrap();

    let matrix = svc
        .criteria_matrix(&CriteriaFilter {
            audit_id: "FY25".into(),
            q: Some("cc1".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(matrix.criteria.len(), 1);
    assert_eq!(matrix.criteria[0].coverage, CoverageState::Partial);
    assert_eq!(matrix.criteria[0].subcategory, "General");

    // mapped controls without evidence still count as partial coverage
    let prior = svc
        .criteria_matrix(&CriteriaFilter {
            audit_id: "FY24".into(),
            coverage: Some(CoverageState::Partial),
            ..Default::default()
        })
        .await
        .unwrap();
    let ids: Vec<&str> = prior.criteria.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["CC1.1"]);
    assert_eq!(prior.criteria[0].coverage, CoverageState::Partial);

    let covered = svc
        .criteria_matrix(&CriteriaFilter {
            audit_id: "FY24".into(),
            coverage: Some(CoverageState::Covered),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(covered.criteria.is_empty());
}

#[tokio::test]
async fn listings_sort_deterministically_with_id_tie_break() {
    let svc = seeded().await;
    let late = NaiveDate::from_ymd_opt(2099, 1, 1).unwrap();
    for id in ["CTL-003", "CTL-001"] {
        svc.update_snapshot(
            id,
            "FY25",
            SnapshotUpdateBuilder::new().freshness_date(Some(late)).build(),
        )
        .await
        .unwrap();
    }

    let ids = |rows: Vec<th_core::responses::ControlListRow>| {
        rows.into_iter().map(|r| r.id).collect::<Vec<_>>()
    };
    let by_freshness = svc
        .list_controls(&ControlFilter {
            audit_id: "FY25".into(),
            sort: ControlSort::Freshness,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(ids(by_freshness), vec!["CTL-001", "CTL-003", "CTL-002"]);

    let by_evidence = svc
        .list_controls(&ControlFilter {
            audit_id: "FY25".into(),
            sort: ControlSort::Evidence,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(ids(by_evidence), vec!["CTL-001", "CTL-002", "CTL-003"]);

    for (id, priority, assignee) in [
        ("REQ-3", Priority::Low, Some("Bea")),
        ("REQ-1", Priority::High, None),
        ("REQ-2", Priority::High, Some("Abe")),
    ] {
        svc.create_request(NewRequest {
            priority,
            assignee: assignee.map(String::from),
            ..request(id, &[])
        })
        .await
        .unwrap();
    }
    let order = |sort| {
        let svc = &svc;
        async move {
            svc.list_requests(&RequestFilter {
                audit_id: "FY25".into(),
                sort,
                ..Default::default()
            })
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect::<Vec<_>>()
        }
    };
    assert_eq!(order(RequestSort::Priority).await, vec!["REQ-1", "REQ-2", "REQ-3"]);
    assert_eq!(order(RequestSort::Assignee).await, vec!["REQ-2", "REQ-3", "REQ-1"]);
    assert_eq!(svc.assignee_options("FY25").await.unwrap(), vec!["Abe", "Bea"]);

    let open = svc
        .list_requests(&RequestFilter {
            audit_id: "FY25".into(),
            status: Some(RequestStatus::Open),
            q: Some("req-2".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
}

#[tokio::test]
async fn unknown_audit_listings_are_empty_and_details_missing() {
    let svc = seeded().await;
    assert!(
        svc.list_requests(&RequestFilter {
            audit_id: "FY99".into(),
            ..Default::default()
        })
        .await
        .unwrap()
        .is_empty()
    );
    svc.create_evidence(NewEvidence {
        filename: "x.txt".into(),
        file_path: "/x.txt".into(),
        ..Default::default()
    })
    .await
    .unwrap();
    let rows = svc
        .list_evidence(&EvidenceFilter {
            audit_id: "FY99".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(rows.iter().all(|r| r.missing_control_links));

    let err = svc.dashboard("FY99").await.unwrap_err();
    assert!(matches!(err, DatabaseError::NotFound { entity: EntityType::Audit, .. }));
}
