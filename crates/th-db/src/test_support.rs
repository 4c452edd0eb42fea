//! Shared test utilities for th-db unit tests.

#[cfg(test)]
pub(crate) mod helpers {
    use th_core::enums::AuditStatus;

    use crate::TrustHubDb;
    use crate::repos::audit::{ImportedAudit, NewAudit};
    use crate::repos::catalog::NewControl;
    use crate::service::TrustHubService;

    /// Create an in-memory service acting as `Tester`.
    pub async fn test_service() -> TrustHubService {
        let db = TrustHubDb::open_local(":memory:").await.unwrap();
        TrustHubService::from_db(db, "Tester")
    }

    /// Add catalog controls named after their ids.
    pub async fn seed_controls(svc: &TrustHubService, ids: &[&str]) {
        for id in ids {
            svc.create_control(NewControl::new(*id, format!("Control {id}")))
                .await
                .unwrap();
        }
    }

    /// A closed audit import named after its id.
    pub fn closed_import(id: &str) -> ImportedAudit {
        ImportedAudit {
            id: id.to_string(),
            name: id.to_string(),
            status: AuditStatus::Closed,
            period_start: None,
            period_end: None,
            auditor_firm: None,
            closed_at: None,
        }
    }

    /// Two controls, closed `FY24` and active `FY25` cloned from it.
    pub async fn seed_closed_and_active(svc: &TrustHubService) {
        seed_controls(svc, &["CTL-001", "CTL-002"]).await;
        svc.import_audit(closed_import("FY24")).await.unwrap();
        svc.start_audit(NewAudit {
            id: "FY25".into(),
            name: "FY25".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    }

    /// Number of snapshot rows scoped to `audit_id`.
    pub async fn count_snapshots(svc: &TrustHubService, audit_id: &str) -> i64 {
        let mut rows = svc
            .db()
            .conn()
            .query(
                "SELECT COUNT(*) FROM control_snapshots WHERE audit_id = ?1",
                [audit_id],
            )
            .await
            .unwrap();
        rows.next().await.unwrap().unwrap().get::<i64>(0).unwrap()
    }
}
