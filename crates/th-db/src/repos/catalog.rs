//! Master catalog repository: controls, criteria, and their mapping.
//!
//! Catalog edits are never gated by audit status. Adding a control inserts a
//! default snapshot into every existing audit so each (control, audit) pair
//! always has one.

use chrono::Utc;
use tracing::info;

use th_core::activity_detail::LinkedDetail;
use th_core::entities::{Control, Criterion};
use th_core::enums::{ActivityAction, ControlKind, EntityType};

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum, require_non_blank, to_detail};
use crate::repos::activity::Activity;
use crate::service::{TrustHubService, finish};
use crate::updates::control::ControlUpdate;

const CONTROL_COLS: &str = "id, name, description, domain, kind, created_at, updated_at";
const CRITERION_COLS: &str = "id, name, category, subcategory";

/// Input for [`TrustHubService::create_control`].
#[derive(Debug, Clone)]
pub struct NewControl {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub domain: Option<String>,
    pub kind: ControlKind,
}

impl NewControl {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            domain: None,
            kind: ControlKind::Control,
        }
    }
}

pub(crate) fn row_to_control(row: &libsql::Row) -> Result<Control, DatabaseError> {
    Ok(Control {
        id: row.get(0)?,
        name: row.get(1)?,
        description: get_opt_string(row, 2)?,
        domain: get_opt_string(row, 3)?,
        kind: parse_enum(&row.get::<String>(4)?)?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
        updated_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

pub(crate) fn row_to_criterion(row: &libsql::Row) -> Result<Criterion, DatabaseError> {
    Ok(Criterion {
        id: row.get(0)?,
        name: row.get(1)?,
        category: get_opt_string(row, 2)?,
        subcategory: get_opt_string(row, 3)?,
    })
}

impl TrustHubService {
    /// Add a control to the catalog with a default snapshot in every audit.
    ///
    /// # Errors
    ///
    /// `Validation` for blank id or name, `AlreadyExists` for a taken id.
    pub async fn create_control(&self, input: NewControl) -> Result<Control, DatabaseError> {
        let id = require_non_blank("control id", &input.id)?.to_string();
        let name = require_non_blank("control name", &input.name)?.to_string();
        if self.find_control(&id).await?.is_some() {
            return Err(DatabaseError::already_exists(EntityType::Control, id));
        }

        let now = Utc::now();
        let control = Control {
            id,
            name,
            description: input.description,
            domain: input.domain,
            kind: input.kind,
            created_at: now,
            updated_at: now,
        };

        let tx = self.begin().await?;
        let result = async {
            tx.execute(
                &format!("INSERT INTO controls ({CONTROL_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
                libsql::params![
                    control.id.as_str(),
                    control.name.as_str(),
                    control.description.as_deref(),
                    control.domain.as_deref(),
                    control.kind.as_str(),
                    now.to_rfc3339(),
                    now.to_rfc3339()
                ],
            )
            .await?;
            let snapshots = tx
                .execute(
                    "INSERT INTO control_snapshots (control_id, audit_id, created_at, updated_at)
                     SELECT ?1, a.id, ?2, ?2 FROM audits a",
                    libsql::params![control.id.as_str(), now.to_rfc3339()],
                )
                .await?;
            self.record_activity(
                &tx,
                Activity::new(None, EntityType::Control, &control.id, ActivityAction::Created)
                    .with_detail(serde_json::json!({ "snapshots_created": snapshots })),
            )
            .await?;
            Ok::<_, DatabaseError>(snapshots)
        }
        .await;
        let snapshots = finish(tx, result).await?;

        info!(control_id = %control.id, snapshots, "control added to catalog");
        Ok(control)
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn find_control(&self, id: &str) -> Result<Option<Control>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {CONTROL_COLS} FROM controls WHERE id = ?1"),
                [id],
            )
            .await?;
        rows.next().await?.map(|row| row_to_control(&row)).transpose()
    }

    /// # Errors
    ///
    /// `NotFound` when no control has this ID.
    pub async fn get_control(&self, id: &str) -> Result<Control, DatabaseError> {
        self.find_control(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(EntityType::Control, id))
    }

    /// Require every id in `ids` to name a catalog control.
    pub(crate) async fn ensure_controls_exist(&self, ids: &[String]) -> Result<(), DatabaseError> {
        for id in ids {
            if self.find_control(id).await?.is_none() {
                return Err(DatabaseError::not_found(EntityType::Control, id.as_str()));
            }
        }
        Ok(())
    }

    /// Edit catalog fields of a control. Snapshots are unaffected.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty update or blank name, `NotFound` for an
    /// unknown control.
    pub async fn update_control(
        &self,
        control_id: &str,
        update: ControlUpdate,
    ) -> Result<Control, DatabaseError> {
        if let Some(ref name) = update.name {
            require_non_blank("control name", name)?;
        }
        let mut set = update.set_clause();
        if set.is_empty() {
            return Err(DatabaseError::Validation("no fields to update".to_string()));
        }
        self.get_control(control_id).await?;

        set.push("updated_at", Utc::now().to_rfc3339());
        let (sql, params) = set.into_statement("controls", &[("id", control_id)]);

        let tx = self.begin().await?;
        let result = async {
            tx.execute(&sql, libsql::params_from_iter(params)).await?;
            self.record_activity(
                &tx,
                Activity::new(None, EntityType::Control, control_id, ActivityAction::Updated)
                    .with_detail(to_detail(&update)?),
            )
            .await?;
            Ok::<_, DatabaseError>(())
        }
        .await;
        finish(tx, result).await?;

        self.get_control(control_id).await
    }

    /// # Errors
    ///
    /// `Validation` for blank id or name, `AlreadyExists` for a taken id.
    pub async fn create_criterion(&self, criterion: Criterion) -> Result<Criterion, DatabaseError> {
        let id = require_non_blank("criterion id", &criterion.id)?.to_string();
        let name = require_non_blank("criterion name", &criterion.name)?.to_string();
        if self.find_criterion(&id).await?.is_some() {
            return Err(DatabaseError::already_exists(EntityType::Criterion, id));
        }
        let criterion = Criterion { id, name, ..criterion };

        let tx = self.begin().await?;
        let result = async {
            tx.execute(
                &format!("INSERT INTO criteria ({CRITERION_COLS}) VALUES (?1, ?2, ?3, ?4)"),
                libsql::params![
                    criterion.id.as_str(),
                    criterion.name.as_str(),
                    criterion.category.as_deref(),
                    criterion.subcategory.as_deref()
                ],
            )
            .await?;
            self.record_activity(
                &tx,
                Activity::new(None, EntityType::Criterion, &criterion.id, ActivityAction::Created),
            )
            .await?;
            Ok::<_, DatabaseError>(())
        }
        .await;
        finish(tx, result).await?;
        Ok(criterion)
    }

    async fn find_criterion(&self, id: &str) -> Result<Option<Criterion>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {CRITERION_COLS} FROM criteria WHERE id = ?1"),
                [id],
            )
            .await?;
        rows.next().await?.map(|row| row_to_criterion(&row)).transpose()
    }

    /// Map a control to a criterion. Mapping twice is a no-op.
    ///
    /// Returns whether a new mapping was inserted.
    ///
    /// # Errors
    ///
    /// `NotFound` when either side does not exist.
    pub async fn map_control_criterion(
        &self,
        control_id: &str,
        criterion_id: &str,
    ) -> Result<bool, DatabaseError> {
        self.get_control(control_id).await?;
        if self.find_criterion(criterion_id).await?.is_none() {
            return Err(DatabaseError::not_found(EntityType::Criterion, criterion_id));
        }

        let tx = self.begin().await?;
        let result = async {
            let inserted = tx
                .execute(
                    "INSERT OR IGNORE INTO control_criteria (control_id, criteria_id) VALUES (?1, ?2)",
                    [control_id, criterion_id],
                )
                .await?
                > 0;
            let detail = LinkedDetail {
                target_type: EntityType::Criterion.as_str().to_string(),
                target_id: criterion_id.to_string(),
                inserted,
            };
            self.record_activity(
                &tx,
                Activity::new(None, EntityType::Control, control_id, ActivityAction::Linked)
                    .with_detail(to_detail(&detail)?),
            )
            .await?;
            Ok::<_, DatabaseError>(inserted)
        }
        .await;
        finish(tx, result).await
    }

    /// All criteria, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_criteria(&self) -> Result<Vec<Criterion>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {CRITERION_COLS} FROM criteria ORDER BY id"),
                (),
            )
            .await?;
        let mut criteria = Vec::new();
        while let Some(row) = rows.next().await? {
            criteria.push(row_to_criterion(&row)?);
        }
        Ok(criteria)
    }
}
