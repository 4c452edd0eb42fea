//! Snapshot store: per-audit compliance state of each control.
//!
//! Rows are created in bulk by the lifecycle manager and by
//! [`TrustHubService::create_control`]. The only mutation here is the gated
//! field patch.

use chrono::Utc;
use tracing::debug;

use th_core::entities::ControlSnapshot;
use th_core::enums::{ActivityAction, EntityType};

use crate::error::DatabaseError;
use crate::gateway::recheck_writable;
use crate::helpers::{get_opt_date, get_opt_string, parse_datetime, parse_enum, to_detail};
use crate::repos::activity::Activity;
use crate::service::{TrustHubService, finish};
use crate::updates::snapshot::SnapshotUpdate;

const SELECT_COLS: &str = "control_id, audit_id, implementation_status, testing_status, \
     automation_status, owner, freshness_date, notes, created_at, updated_at";

fn row_to_snapshot(row: &libsql::Row) -> Result<ControlSnapshot, DatabaseError> {
    Ok(ControlSnapshot {
        control_id: row.get(0)?,
        audit_id: row.get(1)?,
        implementation_status: parse_enum(&row.get::<String>(2)?)?,
        testing_status: parse_enum(&row.get::<String>(3)?)?,
        automation_status: parse_enum(&row.get::<String>(4)?)?,
        owner: get_opt_string(row, 5)?,
        freshness_date: get_opt_date(row, 6)?,
        notes: get_opt_string(row, 7)?,
        created_at: parse_datetime(&row.get::<String>(8)?)?,
        updated_at: parse_datetime(&row.get::<String>(9)?)?,
    })
}

impl TrustHubService {
    /// Look up the snapshot for a (control, audit) pair.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn find_snapshot(
        &self,
        control_id: &str,
        audit_id: &str,
    ) -> Result<Option<ControlSnapshot>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM control_snapshots
                     WHERE control_id = ?1 AND audit_id = ?2"
                ),
                [control_id, audit_id],
            )
            .await?;
        rows.next().await?.map(|row| row_to_snapshot(&row)).transpose()
    }

    /// # Errors
    ///
    /// `NotFound` when the pair has no snapshot.
    pub async fn get_snapshot(
        &self,
        control_id: &str,
        audit_id: &str,
    ) -> Result<ControlSnapshot, DatabaseError> {
        self.find_snapshot(control_id, audit_id)
            .await?
            .ok_or_else(|| {
                DatabaseError::not_found(EntityType::Snapshot, format!("{control_id}@{audit_id}"))
            })
    }

    /// Every snapshot in an audit, ordered by control id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_snapshots(&self, audit_id: &str) -> Result<Vec<ControlSnapshot>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM control_snapshots
                     WHERE audit_id = ?1 ORDER BY control_id"
                ),
                [audit_id],
            )
            .await?;
        let mut snapshots = Vec::new();
        while let Some(row) = rows.next().await? {
            snapshots.push(row_to_snapshot(&row)?);
        }
        Ok(snapshots)
    }

    /// Patch the snapshot of `control_id` in `audit_id`.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty patch, gateway errors for an unknown or
    /// closed audit, `NotFound` when the control has no snapshot there.
    pub async fn update_snapshot(
        &self,
        control_id: &str,
        audit_id: &str,
        update: SnapshotUpdate,
    ) -> Result<ControlSnapshot, DatabaseError> {
        let mut set = update.set_clause();
        if set.is_empty() {
            return Err(DatabaseError::Validation("no fields to update".to_string()));
        }
        self.ensure_audit_writable(audit_id).await?;

        set.push("updated_at", Utc::now().to_rfc3339());
        let (sql, params) = set.into_statement(
            "control_snapshots",
            &[("control_id", control_id), ("audit_id", audit_id)],
        );

        let tx = self.begin().await?;
        let result = async {
            recheck_writable(&tx, audit_id).await?;
            let changed = tx.execute(&sql, libsql::params_from_iter(params)).await?;
            if changed == 0 {
                return Err(DatabaseError::not_found(
                    EntityType::Snapshot,
                    format!("{control_id}@{audit_id}"),
                ));
            }
            self.record_activity(
                &tx,
                Activity::new(Some(audit_id), EntityType::Snapshot, control_id, ActivityAction::Updated)
                    .with_detail(to_detail(&update)?),
            )
            .await?;
            Ok::<_, DatabaseError>(())
        }
        .await;
        finish(tx, result).await?;

        debug!(control_id, audit_id, "snapshot updated");
        self.get_snapshot(control_id, audit_id).await
    }
}
