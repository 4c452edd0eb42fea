//! Activity log repository.
//!
//! Append-only entries recording every mutation. Entries are written on the
//! connection of the mutation's transaction so they commit or roll back with it.

use chrono::Utc;

use th_core::entities::ActivityEntry;
use th_core::enums::{ActivityAction, EntityType};
use th_core::ids::PREFIX_ACTIVITY;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum, parse_optional_json};
use crate::service::TrustHubService;

/// Filter criteria for activity queries.
#[derive(Debug, Default)]
pub struct ActivityFilter {
    pub audit_id: Option<String>,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub action: Option<ActivityAction>,
    pub limit: Option<u32>,
}

/// What happened, to which entity, within which audit.
#[derive(Debug, Clone)]
pub(crate) struct Activity<'a> {
    pub audit_id: Option<&'a str>,
    pub entity_type: EntityType,
    pub entity_id: &'a str,
    pub action: ActivityAction,
    pub detail: Option<serde_json::Value>,
}

impl<'a> Activity<'a> {
    pub(crate) const fn new(
        audit_id: Option<&'a str>,
        entity_type: EntityType,
        entity_id: &'a str,
        action: ActivityAction,
    ) -> Self {
        Self {
            audit_id,
            entity_type,
            entity_id,
            action,
            detail: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

fn row_to_entry(row: &libsql::Row) -> Result<ActivityEntry, DatabaseError> {
    Ok(ActivityEntry {
        id: row.get(0)?,
        audit_id: get_opt_string(row, 1)?,
        actor: row.get(2)?,
        entity_type: parse_enum(&row.get::<String>(3)?)?,
        entity_id: row.get(4)?,
        action: parse_enum(&row.get::<String>(5)?)?,
        detail: parse_optional_json(get_opt_string(row, 6)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

impl TrustHubService {
    /// Append an activity entry on `conn`. Called by every mutation method.
    pub(crate) async fn record_activity(
        &self,
        conn: &libsql::Connection,
        activity: Activity<'_>,
    ) -> Result<ActivityEntry, DatabaseError> {
        let id = crate::generate_id(conn, PREFIX_ACTIVITY).await?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO activity_log (id, audit_id, actor, entity_type, entity_id, action, detail, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            libsql::params![
                id.as_str(),
                activity.audit_id,
                self.actor(),
                activity.entity_type.as_str(),
                activity.entity_id,
                activity.action.as_str(),
                activity.detail.as_ref().map(ToString::to_string),
                now.to_rfc3339()
            ],
        )
        .await?;

        Ok(ActivityEntry {
            id,
            audit_id: activity.audit_id.map(String::from),
            actor: self.actor().to_string(),
            entity_type: activity.entity_type,
            entity_id: activity.entity_id.to_string(),
            action: activity.action,
            detail: activity.detail,
            created_at: now,
        })
    }

    /// Query activity entries with optional filters, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn query_activity(
        &self,
        filter: &ActivityFilter,
    ) -> Result<Vec<ActivityEntry>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(ref audit_id) = filter.audit_id {
            params.push(libsql::Value::Text(audit_id.clone()));
            conditions.push(format!("audit_id = ?{}", params.len()));
        }
        if let Some(ref et) = filter.entity_type {
            params.push(libsql::Value::Text(et.as_str().to_string()));
            conditions.push(format!("entity_type = ?{}", params.len()));
        }
        if let Some(ref eid) = filter.entity_id {
            params.push(libsql::Value::Text(eid.clone()));
            conditions.push(format!("entity_id = ?{}", params.len()));
        }
        if let Some(ref action) = filter.action {
            params.push(libsql::Value::Text(action.as_str().to_string()));
            conditions.push(format!("action = ?{}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let limit = filter.limit.unwrap_or(100);
        let sql = format!(
            "SELECT id, audit_id, actor, entity_type, entity_id, action, detail, created_at
             FROM activity_log {where_clause}
             ORDER BY created_at DESC, rowid DESC LIMIT {limit}"
        );

        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(row_to_entry(&row)?);
        }
        Ok(entries)
    }
}
