//! Request repository.
//!
//! Requests are scoped to the audit they were created in and follow its
//! lifecycle: every write passes the gateway against that audit.

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use th_core::activity_detail::{CascadeDetail, LinkedDetail};
use th_core::entities::Request;
use th_core::enums::{ActivityAction, EntityType, Priority, RequestStatus};

use crate::error::DatabaseError;
use crate::gateway::recheck_writable;
use crate::helpers::{
    format_date, get_opt_date, get_opt_string, parse_datetime, parse_enum, require_non_blank,
    to_detail,
};
use crate::repos::activity::Activity;
use crate::service::{TrustHubService, finish};
use crate::updates::request::RequestUpdate;

pub(crate) const SELECT_COLS: &str = "id, audit_id, external_ref, summary, description, status, \
     priority, assignee, source, due_date, created_at, updated_at";

/// Child tables removed before a request row, in this order.
const CASCADE: [&str; 3] = ["request_evidence", "request_controls", "comments"];

/// Input for [`TrustHubService::create_request`].
#[derive(Debug, Clone, Default)]
pub struct NewRequest {
    pub id: String,
    pub audit_id: String,
    pub external_ref: Option<String>,
    pub summary: String,
    pub description: Option<String>,
    pub status: RequestStatus,
    pub priority: Priority,
    pub assignee: Option<String>,
    pub source: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub control_ids: Vec<String>,
}

pub(crate) fn row_to_request(row: &libsql::Row) -> Result<Request, DatabaseError> {
    Ok(Request {
        id: row.get(0)?,
        audit_id: row.get(1)?,
        external_ref: get_opt_string(row, 2)?,
        summary: row.get(3)?,
        description: get_opt_string(row, 4)?,
        status: parse_enum(&row.get::<String>(5)?)?,
        priority: parse_enum(&row.get::<String>(6)?)?,
        assignee: get_opt_string(row, 7)?,
        source: get_opt_string(row, 8)?,
        due_date: get_opt_date(row, 9)?,
        created_at: parse_datetime(&row.get::<String>(10)?)?,
        updated_at: parse_datetime(&row.get::<String>(11)?)?,
    })
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TrustHubService {
    /// Create a request in an active audit, linked to existing controls.
    ///
    /// # Errors
    ///
    /// `Validation` for blank id, audit or summary; gateway errors;
    /// `AlreadyExists` for a taken id; `NotFound` for an unknown control.
    /// Nothing is persisted on error.
    pub async fn create_request(&self, input: NewRequest) -> Result<Request, DatabaseError> {
        let id = require_non_blank("request id", &input.id)?.to_string();
        let audit_id = require_non_blank("audit id", &input.audit_id)?.to_string();
        let summary = require_non_blank("summary", &input.summary)?.to_string();
        self.ensure_audit_writable(&audit_id).await?;
        if self.find_request(&id).await?.is_some() {
            return Err(DatabaseError::already_exists(EntityType::Request, id));
        }
        let control_ids = input.control_ids;
        self.ensure_controls_exist(&control_ids).await?;

        let now = Utc::now();
        let request = Request {
            id,
            audit_id,
            external_ref: blank_to_none(input.external_ref),
            summary,
            description: blank_to_none(input.description),
            status: input.status,
            priority: input.priority,
            assignee: blank_to_none(input.assignee),
            source: blank_to_none(input.source),
            due_date: input.due_date,
            created_at: now,
            updated_at: now,
        };

        let tx = self.begin().await?;
        let result = async {
            recheck_writable(&tx, &request.audit_id).await?;
            tx.execute(
                &format!(
                    "INSERT INTO requests ({SELECT_COLS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                libsql::params![
                    request.id.as_str(),
                    request.audit_id.as_str(),
                    request.external_ref.as_deref(),
                    request.summary.as_str(),
                    request.description.as_deref(),
                    request.status.as_str(),
                    request.priority.as_str(),
                    request.assignee.as_deref(),
                    request.source.as_deref(),
                    request.due_date.map(format_date),
                    now.to_rfc3339(),
                    now.to_rfc3339()
                ],
            )
            .await?;
            for control_id in &control_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO request_controls (request_id, control_id) VALUES (?1, ?2)",
                    [request.id.as_str(), control_id.as_str()],
                )
                .await?;
            }
            self.record_activity(
                &tx,
                Activity::new(
                    Some(&request.audit_id),
                    EntityType::Request,
                    &request.id,
                    ActivityAction::Created,
                )
                .with_detail(serde_json::json!({ "control_ids": control_ids })),
            )
            .await?;
            Ok::<_, DatabaseError>(())
        }
        .await;
        finish(tx, result).await?;

        info!(request_id = %request.id, audit_id = %request.audit_id, "request created");
        Ok(request)
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn find_request(&self, id: &str) -> Result<Option<Request>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM requests WHERE id = ?1"), [id])
            .await?;
        rows.next().await?.map(|row| row_to_request(&row)).transpose()
    }

    /// # Errors
    ///
    /// `NotFound` when no request has this ID.
    pub async fn get_request(&self, id: &str) -> Result<Request, DatabaseError> {
        self.find_request(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(EntityType::Request, id))
    }

    /// Patch a request. Its audit is never changed.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty patch or blank summary, `NotFound` for an
    /// unknown request, `AuditClosed` when its audit is closed.
    pub async fn update_request(
        &self,
        request_id: &str,
        update: RequestUpdate,
    ) -> Result<Request, DatabaseError> {
        if let Some(ref summary) = update.summary {
            require_non_blank("summary", summary)?;
        }
        let mut set = update.set_clause();
        if set.is_empty() {
            return Err(DatabaseError::Validation("no fields to update".to_string()));
        }
        let request = self.ensure_request_writable(request_id).await?;

        set.push("updated_at", Utc::now().to_rfc3339());
        let (sql, params) = set.into_statement("requests", &[("id", request_id)]);

        let tx = self.begin().await?;
        let result = async {
            recheck_writable(&tx, &request.audit_id).await?;
            tx.execute(&sql, libsql::params_from_iter(params)).await?;
            self.record_activity(
                &tx,
                Activity::new(
                    Some(&request.audit_id),
                    EntityType::Request,
                    request_id,
                    ActivityAction::Updated,
                )
                .with_detail(to_detail(&update)?),
            )
            .await?;
            Ok::<_, DatabaseError>(())
        }
        .await;
        finish(tx, result).await?;

        debug!(request_id, "request updated");
        self.get_request(request_id).await
    }

    /// Delete a request with its evidence links, control links and comments.
    ///
    /// Evidence rows themselves are global and survive.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown request, `AuditClosed` when its audit is
    /// closed.
    pub async fn delete_request(&self, request_id: &str) -> Result<(), DatabaseError> {
        let request = self.ensure_request_writable(request_id).await?;

        let tx = self.begin().await?;
        let result = async {
            recheck_writable(&tx, &request.audit_id).await?;
            let mut removed = Vec::with_capacity(CASCADE.len());
            for table in CASCADE {
                let n = tx
                    .execute(
                        &format!("DELETE FROM {table} WHERE request_id = ?1"),
                        [request_id],
                    )
                    .await?;
                removed.push((table.to_string(), n));
            }
            tx.execute("DELETE FROM requests WHERE id = ?1", [request_id])
                .await?;
            self.record_activity(
                &tx,
                Activity::new(
                    Some(&request.audit_id),
                    EntityType::Request,
                    request_id,
                    ActivityAction::Deleted,
                )
                .with_detail(to_detail(&CascadeDetail { removed })?),
            )
            .await?;
            Ok::<_, DatabaseError>(())
        }
        .await;
        finish(tx, result).await?;

        info!(request_id, audit_id = %request.audit_id, "request deleted");
        Ok(())
    }

    /// Link a control to a request. Linking twice is a no-op.
    ///
    /// Evidence already attached to the request is not linked to the new
    /// control; the auto-link happens only when evidence is added.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown request or control, `AuditClosed` when the
    /// request's audit is closed.
    pub async fn link_request_control(
        &self,
        request_id: &str,
        control_id: &str,
    ) -> Result<bool, DatabaseError> {
        let request = self.ensure_request_writable(request_id).await?;
        self.get_control(control_id).await?;

        let tx = self.begin().await?;
        let result = async {
            recheck_writable(&tx, &request.audit_id).await?;
            let inserted = tx
                .execute(
                    "INSERT OR IGNORE INTO request_controls (request_id, control_id) VALUES (?1, ?2)",
                    [request_id, control_id],
                )
                .await?
                > 0;
            let detail = LinkedDetail {
                target_type: EntityType::Control.as_str().to_string(),
                target_id: control_id.to_string(),
                inserted,
            };
            self.record_activity(
                &tx,
                Activity::new(
                    Some(&request.audit_id),
                    EntityType::Request,
                    request_id,
                    ActivityAction::Linked,
                )
                .with_detail(to_detail(&detail)?),
            )
            .await?;
            Ok::<_, DatabaseError>(inserted)
        }
        .await;
        finish(tx, result).await
    }

    /// Control ids linked to a request, ordered.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn request_control_ids(&self, request_id: &str) -> Result<Vec<String>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT control_id FROM request_controls WHERE request_id = ?1 ORDER BY control_id",
                [request_id],
            )
            .await?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<String>(0)?);
        }
        Ok(ids)
    }

    /// Distinct non-blank assignees of an audit's requests, sorted.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn assignee_options(&self, audit_id: &str) -> Result<Vec<String>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT DISTINCT trim(assignee) AS a FROM requests
                 WHERE audit_id = ?1 AND trim(COALESCE(assignee, '')) != ''
                 ORDER BY a",
                [audit_id],
            )
            .await?;
        let mut names = Vec::new();
        while let Some(row) = rows.next().await? {
            names.push(row.get::<String>(0)?);
        }
        Ok(names)
    }
}
