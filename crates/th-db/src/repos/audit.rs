//! Audit lifecycle repository.
//!
//! Owns every audit status transition: start (clone from the most recently
//! closed audit), close, and import. At most one audit is active at a time.
//! The check is done in application code before the insert; two concurrent
//! starts can both pass it.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use th_core::activity_detail::{ClonedDetail, ImportedDetail, StatusChangedDetail};
use th_core::entities::Audit;
use th_core::enums::{ActivityAction, AuditStatus, EntityType};
use th_core::responses::AuditSelection;

use crate::error::DatabaseError;
use crate::helpers::{
    format_date, get_opt_date, get_opt_string, parse_datetime, parse_enum,
    parse_optional_datetime, require_non_blank, to_detail,
};
use crate::repos::activity::Activity;
use crate::service::{TrustHubService, finish};

const SELECT_COLS: &str = "id, name, status, period_start, period_end, auditor_firm, closed_at, created_at, updated_at";

/// Active first, then newest period, then newest record.
const LIST_ORDER: &str = "CASE WHEN status = 'active' THEN 0 ELSE 1 END,
     period_start IS NULL, period_start DESC, created_at DESC, id";

/// Input for [`TrustHubService::start_audit`].
#[derive(Debug, Clone, Default)]
pub struct NewAudit {
    pub id: String,
    pub name: String,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub auditor_firm: Option<String>,
}

/// Input for [`TrustHubService::import_audit`]: an audit with an explicit
/// status, used to bootstrap history.
#[derive(Debug, Clone)]
pub struct ImportedAudit {
    pub id: String,
    pub name: String,
    pub status: AuditStatus,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub auditor_firm: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
}

fn row_to_audit(row: &libsql::Row) -> Result<Audit, DatabaseError> {
    Ok(Audit {
        id: row.get(0)?,
        name: row.get(1)?,
        status: parse_enum(&row.get::<String>(2)?)?,
        period_start: get_opt_date(row, 3)?,
        period_end: get_opt_date(row, 4)?,
        auditor_firm: get_opt_string(row, 5)?,
        closed_at: parse_optional_datetime(get_opt_string(row, 6)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
        updated_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

fn validate_period(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), DatabaseError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(DatabaseError::Validation(format!(
                "period_end {end} is before period_start {start}"
            )));
        }
    }
    Ok(())
}

/// Insert an audit row on `conn`.
async fn insert_audit(conn: &libsql::Connection, audit: &Audit) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO audits ({SELECT_COLS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        ),
        libsql::params![
            audit.id.as_str(),
            audit.name.as_str(),
            audit.status.as_str(),
            audit.period_start.map(format_date),
            audit.period_end.map(format_date),
            audit.auditor_firm.as_deref(),
            audit.closed_at.map(|t| t.to_rfc3339()),
            audit.created_at.to_rfc3339(),
            audit.updated_at.to_rfc3339()
        ],
    )
    .await?;
    Ok(())
}

/// Insert a default snapshot into `audit_id` for every catalog control that
/// has none there yet. Returns the number of rows inserted.
pub(crate) async fn fill_default_snapshots(
    conn: &libsql::Connection,
    audit_id: &str,
    now: DateTime<Utc>,
) -> Result<u64, DatabaseError> {
    Ok(conn
        .execute(
            "INSERT INTO control_snapshots (control_id, audit_id, created_at, updated_at)
             SELECT c.id, ?1, ?2, ?2
             FROM controls c
             WHERE NOT EXISTS (
                 SELECT 1 FROM control_snapshots cs
                 WHERE cs.control_id = c.id AND cs.audit_id = ?1
             )",
            libsql::params![audit_id, now.to_rfc3339()],
        )
        .await?)
}

impl TrustHubService {
    /// All audits: active first, then `period_start` descending.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_audits(&self) -> Result<Vec<Audit>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM audits ORDER BY {LIST_ORDER}"),
                (),
            )
            .await?;
        let mut audits = Vec::new();
        while let Some(row) = rows.next().await? {
            audits.push(row_to_audit(&row)?);
        }
        Ok(audits)
    }

    /// Look up an audit without treating absence as an error.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn find_audit(&self, id: &str) -> Result<Option<Audit>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM audits WHERE id = ?1"), [id])
            .await?;
        rows.next().await?.map(|row| row_to_audit(&row)).transpose()
    }

    /// # Errors
    ///
    /// `NotFound` when no audit has this ID.
    pub async fn get_audit(&self, id: &str) -> Result<Audit, DatabaseError> {
        self.find_audit(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(EntityType::Audit, id))
    }

    /// The single active audit, if any.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get_active_audit(&self) -> Result<Option<Audit>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM audits WHERE status = 'active'
                     ORDER BY created_at DESC LIMIT 1"
                ),
                (),
            )
            .await?;
        rows.next().await?.map(|row| row_to_audit(&row)).transpose()
    }

    /// Most recently closed audit: the clone source for the next start.
    async fn latest_closed_audit(&self) -> Result<Option<Audit>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM audits WHERE status = 'closed'
                     ORDER BY closed_at DESC, created_at DESC LIMIT 1"
                ),
                (),
            )
            .await?;
        rows.next().await?.map(|row| row_to_audit(&row)).transpose()
    }

    /// Decide which audit a caller works in.
    ///
    /// The requested audit wins when it exists, then the active audit, then
    /// the first in list order.
    ///
    /// # Errors
    ///
    /// `InvalidState` when no audits exist at all.
    pub async fn resolve_selection(
        &self,
        requested: Option<&str>,
    ) -> Result<AuditSelection, DatabaseError> {
        let audits = self.list_audits().await?;
        let selected = requested
            .and_then(|id| audits.iter().find(|a| a.id == id))
            .or_else(|| audits.iter().find(|a| a.status == AuditStatus::Active))
            .or_else(|| audits.first())
            .cloned()
            .ok_or_else(|| DatabaseError::InvalidState("no audits configured".to_string()))?;
        if let Some(requested) = requested {
            if requested != selected.id {
                warn!(requested, selected = %selected.id, "requested audit not found, falling back");
            }
        }
        let is_read_only = selected.is_read_only();
        Ok(AuditSelection {
            audits,
            selected,
            is_read_only,
        })
    }

    /// Start a new active audit, cloning snapshot state from the most
    /// recently closed audit.
    ///
    /// Controls the source audit lacks get default snapshots. Everything runs
    /// in one transaction.
    ///
    /// # Errors
    ///
    /// `Validation` for blank id or name, `AlreadyExists` for a taken id,
    /// `ActiveAuditExists` while another audit is active, `NoCloneSource`
    /// when no audit has been closed yet.
    pub async fn start_audit(&self, input: NewAudit) -> Result<Audit, DatabaseError> {
        let id = require_non_blank("audit id", &input.id)?.to_string();
        let name = require_non_blank("audit name", &input.name)?.to_string();
        validate_period(input.period_start, input.period_end)?;

        if self.find_audit(&id).await?.is_some() {
            return Err(DatabaseError::already_exists(EntityType::Audit, id));
        }
        if let Some(active) = self.get_active_audit().await? {
            warn!(active = %active.id, "start rejected: audit still active");
            return Err(DatabaseError::ActiveAuditExists { audit_id: active.id });
        }
        let source = self
            .latest_closed_audit()
            .await?
            .ok_or(DatabaseError::NoCloneSource)?;

        let now = Utc::now();
        let audit = Audit {
            id,
            name,
            status: AuditStatus::Active,
            period_start: input.period_start,
            period_end: input.period_end,
            auditor_firm: input.auditor_firm.filter(|f| !f.trim().is_empty()),
            closed_at: None,
            created_at: now,
            updated_at: now,
        };

        let tx = self.begin().await?;
        let result = async {
            insert_audit(&tx, &audit).await?;
            let snapshots_cloned = tx
                .execute(
                    "INSERT INTO control_snapshots
                        (control_id, audit_id, implementation_status, testing_status,
                         automation_status, owner, freshness_date, notes, created_at, updated_at)
                     SELECT control_id, ?1, implementation_status, testing_status,
                            automation_status, owner, freshness_date, notes, ?3, ?3
                     FROM control_snapshots
                     WHERE audit_id = ?2",
                    libsql::params![audit.id.as_str(), source.id.as_str(), now.to_rfc3339()],
                )
                .await?;
            let snapshots_defaulted = fill_default_snapshots(&tx, &audit.id, now).await?;
            let detail = ClonedDetail {
                source_audit_id: source.id.clone(),
                snapshots_cloned,
                snapshots_defaulted,
            };
            self.record_activity(
                &tx,
                Activity::new(Some(&audit.id), EntityType::Audit, &audit.id, ActivityAction::Cloned)
                    .with_detail(to_detail(&detail)?),
            )
            .await?;
            Ok::<_, DatabaseError>(detail)
        }
        .await;
        let detail = finish(tx, result).await?;

        info!(
            audit_id = %audit.id,
            source = %detail.source_audit_id,
            cloned = detail.snapshots_cloned,
            defaulted = detail.snapshots_defaulted,
            "audit started"
        );
        Ok(audit)
    }

    /// Close an audit, making it and everything scoped to it read-only.
    ///
    /// `None` closes the current active audit. Snapshots are left untouched.
    ///
    /// # Errors
    ///
    /// `Validation` when `None` is passed and no audit is active, `NotFound`
    /// for an unknown id, `AuditAlreadyClosed` when it is already closed.
    pub async fn close_audit(&self, id: Option<&str>) -> Result<Audit, DatabaseError> {
        let audit = match id {
            Some(id) => self.get_audit(id).await?,
            None => self
                .get_active_audit()
                .await?
                .ok_or_else(|| DatabaseError::Validation("no active audit to close".to_string()))?,
        };
        if !audit.status.can_transition_to(AuditStatus::Closed) {
            warn!(audit_id = %audit.id, "close rejected: already closed");
            return Err(DatabaseError::AuditAlreadyClosed { audit_id: audit.id });
        }

        let now = Utc::now();
        let tx = self.begin().await?;
        let result = async {
            let changed = tx
                .execute(
                    "UPDATE audits SET status = 'closed', closed_at = ?1, updated_at = ?1
                     WHERE id = ?2 AND status = 'active'",
                    libsql::params![now.to_rfc3339(), audit.id.as_str()],
                )
                .await?;
            if changed == 0 {
                return Err(DatabaseError::AuditAlreadyClosed {
                    audit_id: audit.id.clone(),
                });
            }
            let detail = StatusChangedDetail {
                from: AuditStatus::Active.as_str().to_string(),
                to: AuditStatus::Closed.as_str().to_string(),
            };
            self.record_activity(
                &tx,
                Activity::new(
                    Some(&audit.id),
                    EntityType::Audit,
                    &audit.id,
                    ActivityAction::StatusChanged,
                )
                .with_detail(to_detail(&detail)?),
            )
            .await?;
            Ok::<_, DatabaseError>(())
        }
        .await;
        finish(tx, result).await?;

        info!(audit_id = %audit.id, "audit closed");
        self.get_audit(&audit.id).await
    }

    /// Insert an audit with an explicit status and a default snapshot per
    /// catalog control.
    ///
    /// # Errors
    ///
    /// `Validation` for blank id or name, `AlreadyExists` for a taken id,
    /// `ActiveAuditExists` when importing an active audit while another is
    /// active.
    pub async fn import_audit(&self, input: ImportedAudit) -> Result<Audit, DatabaseError> {
        let id = require_non_blank("audit id", &input.id)?.to_string();
        let name = require_non_blank("audit name", &input.name)?.to_string();
        validate_period(input.period_start, input.period_end)?;

        if self.find_audit(&id).await?.is_some() {
            return Err(DatabaseError::already_exists(EntityType::Audit, id));
        }
        if input.status == AuditStatus::Active {
            if let Some(active) = self.get_active_audit().await? {
                return Err(DatabaseError::ActiveAuditExists { audit_id: active.id });
            }
        }

        let now = Utc::now();
        let closed_at = match input.status {
            AuditStatus::Active => None,
            AuditStatus::Closed => Some(input.closed_at.unwrap_or(now)),
        };
        let audit = Audit {
            id,
            name,
            status: input.status,
            period_start: input.period_start,
            period_end: input.period_end,
            auditor_firm: input.auditor_firm.filter(|f| !f.trim().is_empty()),
            closed_at,
            created_at: now,
            updated_at: now,
        };

        let tx = self.begin().await?;
        let result = async {
            insert_audit(&tx, &audit).await?;
            let snapshots_created = fill_default_snapshots(&tx, &audit.id, now).await?;
            let detail = ImportedDetail {
                status: audit.status.as_str().to_string(),
                snapshots_created,
            };
            self.record_activity(
                &tx,
                Activity::new(Some(&audit.id), EntityType::Audit, &audit.id, ActivityAction::Imported)
                    .with_detail(to_detail(&detail)?),
            )
            .await?;
            Ok::<_, DatabaseError>(snapshots_created)
        }
        .await;
        let snapshots_created = finish(tx, result).await?;

        info!(audit_id = %audit.id, status = %audit.status, snapshots_created, "audit imported");
        Ok(audit)
    }
}
