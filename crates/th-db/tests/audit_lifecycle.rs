//! Audit lifecycle integration tests: clone-on-start, the closed-audit lock,
//! and the single-active invariant, against in-memory and file-backed stores.

use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use th_core::enums::{AuditStatus, EntityType, ImplementationStatus, TestingStatus};
use th_core::errors::ErrorKind;
use th_db::error::DatabaseError;
use th_db::repos::audit::{ImportedAudit, NewAudit};
use th_db::repos::catalog::NewControl;
use th_db::service::TrustHubService;
use th_db::updates::snapshot::SnapshotUpdateBuilder;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn service() -> TrustHubService {
    TrustHubService::new_local(":memory:", "Auditor Ops").await.unwrap()
}

fn closed(id: &str) -> ImportedAudit {
    ImportedAudit {
        id: id.to_string(),
        name: format!("SOC 2 {id}"),
        status: AuditStatus::Closed,
        period_start: None,
        period_end: None,
        auditor_firm: None,
        closed_at: None,
    }
}

fn new_audit(id: &str) -> NewAudit {
    NewAudit {
        id: id.to_string(),
        name: format!("SOC 2 {id}"),
        ..Default::default()
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn active_ids(svc: &TrustHubService) -> Vec<String> {
    svc.list_audits()
        .await
        .unwrap()
        .into_iter()
        .filter(|a| a.status == AuditStatus::Active)
        .map(|a| a.id)
        .collect()
}

// ---------------------------------------------------------------------------
// Clone-on-start
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_clones_closed_snapshot_verbatim() {
    let svc = service().await;
    svc.create_control(NewControl::new("CTL-001", "Access reviews"))
        .await
        .unwrap();
    svc.import_audit(closed("2025")).await.unwrap();
    // Seeded state for a closed audit is written directly, as an import would.
    svc.db()
        .conn()
        .execute(
            "UPDATE control_snapshots
             SET implementation_status = 'Completed', testing_status = 'Effective',
                 freshness_date = '2099-01-01', owner = 'Jane (jane@corp.io)', notes = 'ok'
             WHERE control_id = 'CTL-001' AND audit_id = '2025'",
            (),
        )
        .await
        .unwrap();

    svc.start_audit(new_audit("2026")).await.unwrap();

    let before = svc.get_snapshot("CTL-001", "2025").await.unwrap();
    let after = svc.get_snapshot("CTL-001", "2026").await.unwrap();
    assert_eq!(after.implementation_status, ImplementationStatus::Completed);
    assert_eq!(after.testing_status, TestingStatus::Effective);
    assert_eq!(
        (after.automation_status, after.owner.clone(), after.freshness_date, after.notes.clone()),
        (before.automation_status, before.owner, before.freshness_date, before.notes)
    );
    assert_eq!(after.freshness_date, Some(date(2099, 1, 1)));
    assert_eq!(active_ids(&svc).await, vec!["2026"]);
}

#[tokio::test]
async fn start_gives_every_catalog_control_a_snapshot() {
    let svc = service().await;
    svc.create_control(NewControl::new("CTL-001", "One")).await.unwrap();
    svc.import_audit(closed("2025")).await.unwrap();
    svc.create_control(NewControl::new("CTL-002", "Two")).await.unwrap();
    svc.db()
        .conn()
        .execute("DELETE FROM control_snapshots WHERE control_id = 'CTL-002'", ())
        .await
        .unwrap();

    svc.start_audit(new_audit("2026")).await.unwrap();

    let ids: Vec<String> = svc
        .list_snapshots("2026")
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.control_id)
        .collect();
    assert_eq!(ids, vec!["CTL-001", "CTL-002"]);
}

#[tokio::test]
async fn start_preconditions_are_checked_in_order() {
    let svc = service().await;

    let err = svc.start_audit(new_audit("2025")).await.unwrap_err();
    assert!(matches!(err, DatabaseError::NoCloneSource));

    svc.import_audit(closed("2024")).await.unwrap();
    let err = svc.start_audit(new_audit("2024")).await.unwrap_err();
    assert!(matches!(err, DatabaseError::AlreadyExists { .. }));

    svc.start_audit(new_audit("2025")).await.unwrap();
    let err = svc.start_audit(new_audit("2026")).await.unwrap_err();
    assert!(matches!(err, DatabaseError::ActiveAuditExists { .. }));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(active_ids(&svc).await, vec!["2025"]);
}

#[tokio::test]
async fn importing_a_second_active_audit_is_rejected() {
    let svc = service().await;
    svc.import_audit(ImportedAudit {
        status: AuditStatus::Active,
        ..closed("2025")
    })
    .await
    .unwrap();
    let err = svc
        .import_audit(ImportedAudit {
            status: AuditStatus::Active,
            ..closed("2026")
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::ActiveAuditExists { .. }));
    assert!(svc.find_audit("2026").await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Closing and the lock
// ---------------------------------------------------------------------------

#[tokio::test]
async fn closed_audit_rejects_snapshot_patch_and_keeps_state() {
    let svc = service().await;
    svc.create_control(NewControl::new("CTL-001", "Access reviews"))
        .await
        .unwrap();
    svc.import_audit(closed("2025")).await.unwrap();
    let before = svc.get_snapshot("CTL-001", "2025").await.unwrap();

    let err = svc
        .update_snapshot(
            "CTL-001",
            "2025",
            SnapshotUpdateBuilder::new()
                .testing_status(TestingStatus::Effective)
                .build(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DatabaseError::AuditClosed { .. }));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.label(), "locked");
    assert_eq!(svc.get_snapshot("CTL-001", "2025").await.unwrap(), before);
}

#[tokio::test]
async fn gateway_separates_missing_from_locked() {
    let svc = service().await;
    svc.create_control(NewControl::new("CTL-001", "Access reviews"))
        .await
        .unwrap();
    let patch = SnapshotUpdateBuilder::new()
        .implementation_status(ImplementationStatus::InProgress)
        .build();

    let err = svc.update_snapshot("CTL-001", "NOPE", patch).await.unwrap_err();
    assert!(matches!(err, DatabaseError::NotFound { entity: EntityType::Audit, .. }));
    assert_eq!(err.label(), "missing");
}

#[tokio::test]
async fn close_then_close_again_is_a_conflict() {
    let svc = service().await;
    svc.import_audit(closed("2024")).await.unwrap();
    svc.start_audit(new_audit("2025")).await.unwrap();

    svc.close_audit(None).await.unwrap();
    let err = svc.close_audit(None).await.unwrap_err();
    assert!(matches!(err, DatabaseError::Validation(_)));

    let err = svc.close_audit(Some("2025")).await.unwrap_err();
    assert!(matches!(err, DatabaseError::AuditAlreadyClosed { .. }));

    let audit = svc.get_audit("2025").await.unwrap();
    assert_eq!(audit.status, AuditStatus::Closed);
    assert!(audit.closed_at.is_some());
    assert!(active_ids(&svc).await.is_empty());
}

#[tokio::test]
async fn selection_falls_back_to_active_then_first() {
    let svc = service().await;
    let err = svc.resolve_selection(None).await.unwrap_err();
    assert!(matches!(err, DatabaseError::InvalidState(_)));

    svc.import_audit(closed("2024")).await.unwrap();
    svc.start_audit(new_audit("2025")).await.unwrap();

    let sel = svc.resolve_selection(Some("2024")).await.unwrap();
    assert_eq!(sel.selected.id, "2024");
    assert!(sel.is_read_only);

    let sel = svc.resolve_selection(Some("1999")).await.unwrap();
    assert_eq!(sel.selected.id, "2025");
    assert!(!sel.is_read_only);
    assert_eq!(sel.audits.len(), 2);
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

#[tokio::test]
async fn state_survives_reopening_a_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trust-hub.db");
    let path = path.to_str().unwrap();

    {
        let svc = TrustHubService::new_local(path, "Ops").await.unwrap();
        svc.create_control(NewControl::new("CTL-001", "Access reviews"))
            .await
            .unwrap();
        svc.import_audit(closed("2024")).await.unwrap();
        svc.start_audit(new_audit("2025")).await.unwrap();
    }

    let svc = TrustHubService::new_local(path, "Ops").await.unwrap();
    let active = svc.get_active_audit().await.unwrap().unwrap();
    assert_eq!(active.id, "2025");
    assert_eq!(svc.list_snapshots("2025").await.unwrap().len(), 1);
}
