//! Policy repository.
//!
//! Policies are global documents, never gated by audit status. Their control
//! relationships are replaced wholesale on update: delete all, then reinsert,
//! in the same transaction as any field change.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use th_core::activity_detail::CascadeDetail;
use th_core::entities::{Policy, PolicyControl};
use th_core::enums::{ActivityAction, EntityType, RelationshipType};
use th_core::freshness::ReviewState;
use th_core::ids::PREFIX_POLICY;
use th_core::responses::{PolicyControlStatus, PolicyDetail, PolicyListRow};

use crate::error::DatabaseError;
use crate::helpers::{
    format_date, get_count, get_flag, get_list, get_opt_date, get_opt_enum, get_opt_string,
    parse_datetime, parse_enum, require_non_blank, to_detail,
};
use crate::repos::activity::Activity;
use crate::repos::filter::WhereBuilder;
use crate::service::{TrustHubService, finish};
use crate::updates::policy::{PolicyLink, PolicyUpdate};

const SELECT_COLS: &str =
    "id, name, description, version, owner, file_path, review_date, created_at, updated_at";

/// Child tables removed before a policy row, in this order.
const CASCADE: [&str; 1] = ["policy_controls"];

/// Input for [`TrustHubService::create_policy`].
#[derive(Debug, Clone, Default)]
pub struct NewPolicy {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub owner: Option<String>,
    pub file_path: Option<String>,
    pub review_date: Option<NaiveDate>,
    pub controls: Vec<PolicyLink>,
}

/// Sort keys for [`TrustHubService::list_policies`]. Ties break on id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicySort {
    /// Review date ascending, undated last.
    #[default]
    Review,
    Name,
    /// Linked control count descending.
    Controls,
}

impl PolicySort {
    const fn order_by(self) -> &'static str {
        match self {
            Self::Review => "p.review_date IS NULL, p.review_date, p.id",
            Self::Name => "lower(p.name), p.id",
            Self::Controls => "linked DESC, p.id",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PolicyFilter {
    /// Substring over name and description.
    pub q: Option<String>,
    pub relationship_type: Option<RelationshipType>,
    /// `NoDate` matches only undated policies; the other states never do.
    pub review_state: Option<ReviewState>,
    pub has_controls: Option<bool>,
    pub sort: PolicySort,
}

fn row_to_policy(row: &libsql::Row) -> Result<Policy, DatabaseError> {
    Ok(Policy {
        id: row.get(0)?,
        name: row.get(1)?,
        description: get_opt_string(row, 2)?,
        version: get_opt_string(row, 3)?,
        owner: get_opt_string(row, 4)?,
        file_path: get_opt_string(row, 5)?,
        review_date: get_opt_date(row, 6)?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
        updated_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

/// Replace the relationship set of `policy_id` with `links`.
///
/// A control listed twice keeps its last relationship type.
async fn replace_links(
    conn: &libsql::Connection,
    policy_id: &str,
    links: &[PolicyLink],
) -> Result<(), DatabaseError> {
    conn.execute("DELETE FROM policy_controls WHERE policy_id = ?1", [policy_id])
        .await?;
    for link in links {
        conn.execute(
            "INSERT INTO policy_controls (policy_id, control_id, relationship_type)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (policy_id, control_id)
             DO UPDATE SET relationship_type = excluded.relationship_type",
            [
                policy_id,
                link.control_id.as_str(),
                link.relationship_type.as_str(),
            ],
        )
        .await?;
    }
    Ok(())
}

fn parse_relationship_types(raw: Vec<String>) -> Result<Vec<RelationshipType>, DatabaseError> {
    let mut raw = raw;
    raw.sort();
    raw.dedup();
    raw.iter().map(|s| parse_enum(s)).collect()
}

impl TrustHubService {
    /// # Errors
    ///
    /// `Validation` for a blank name, `NotFound` for an unknown control in
    /// the relationship set.
    pub async fn create_policy(&self, input: NewPolicy) -> Result<Policy, DatabaseError> {
        let NewPolicy {
            name,
            description,
            version,
            owner,
            file_path,
            review_date,
            controls: links,
        } = input;
        let name = require_non_blank("policy name", &name)?.to_string();
        let control_ids: Vec<String> = links.iter().map(|l| l.control_id.clone()).collect();
        self.ensure_controls_exist(&control_ids).await?;

        let now = Utc::now();
        let tx = self.begin().await?;
        let result = async {
            let policy = Policy {
                id: crate::generate_id(&tx, PREFIX_POLICY).await?,
                name,
                description,
                version,
                owner,
                file_path,
                review_date,
                created_at: now,
                updated_at: now,
            };
            tx.execute(
                &format!("INSERT INTO policies ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
                libsql::params![
                    policy.id.as_str(),
                    policy.name.as_str(),
                    policy.description.as_deref(),
                    policy.version.as_deref(),
                    policy.owner.as_deref(),
                    policy.file_path.as_deref(),
                    policy.review_date.map(format_date),
                    now.to_rfc3339(),
                    now.to_rfc3339()
                ],
            )
            .await?;
            replace_links(&tx, &policy.id, &links).await?;
            self.record_activity(
                &tx,
                Activity::new(None, EntityType::Policy, &policy.id, ActivityAction::Created)
                    .with_detail(serde_json::json!({ "controls": links })),
            )
            .await?;
            Ok::<_, DatabaseError>(policy)
        }
        .await;
        let policy = finish(tx, result).await?;

        info!(policy_id = %policy.id, links = links.len(), "policy created");
        Ok(policy)
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn find_policy(&self, id: &str) -> Result<Option<Policy>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM policies WHERE id = ?1"), [id])
            .await?;
        rows.next().await?.map(|row| row_to_policy(&row)).transpose()
    }

    /// # Errors
    ///
    /// `NotFound` when no policy has this ID.
    pub async fn get_policy(&self, id: &str) -> Result<Policy, DatabaseError> {
        self.find_policy(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(EntityType::Policy, id))
    }

    /// The stored relationship set of a policy, ordered by control id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn policy_links(&self, policy_id: &str) -> Result<Vec<PolicyControl>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT policy_id, control_id, relationship_type FROM policy_controls
                 WHERE policy_id = ?1 ORDER BY control_id",
                [policy_id],
            )
            .await?;
        let mut links = Vec::new();
        while let Some(row) = rows.next().await? {
            links.push(PolicyControl {
                policy_id: row.get(0)?,
                control_id: row.get(1)?,
                relationship_type: parse_enum(&row.get::<String>(2)?)?,
            });
        }
        Ok(links)
    }

    /// Patch fields and/or replace the relationship set.
    ///
    /// # Errors
    ///
    /// `Validation` when nothing would change or the name is blank,
    /// `NotFound` for an unknown policy or control. Nothing is persisted on
    /// error.
    pub async fn update_policy(
        &self,
        policy_id: &str,
        update: PolicyUpdate,
    ) -> Result<Policy, DatabaseError> {
        if update.is_empty() {
            return Err(DatabaseError::Validation("no fields to update".to_string()));
        }
        if let Some(ref name) = update.name {
            require_non_blank("policy name", name)?;
        }
        self.get_policy(policy_id).await?;
        if let Some(ref links) = update.controls {
            let ids: Vec<String> = links.iter().map(|l| l.control_id.clone()).collect();
            self.ensure_controls_exist(&ids).await?;
        }

        let mut set = update.set_clause();
        set.push("updated_at", Utc::now().to_rfc3339());
        let (sql, params) = set.into_statement("policies", &[("id", policy_id)]);

        let tx = self.begin().await?;
        let result = async {
            tx.execute(&sql, libsql::params_from_iter(params)).await?;
            if let Some(ref links) = update.controls {
                replace_links(&tx, policy_id, links).await?;
            }
            self.record_activity(
                &tx,
                Activity::new(None, EntityType::Policy, policy_id, ActivityAction::Updated)
                    .with_detail(to_detail(&update)?),
            )
            .await?;
            Ok::<_, DatabaseError>(())
        }
        .await;
        finish(tx, result).await?;

        debug!(policy_id, replaced_links = update.controls.is_some(), "policy updated");
        self.get_policy(policy_id).await
    }

    /// Delete a policy and its relationships.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown policy.
    pub async fn delete_policy(&self, policy_id: &str) -> Result<(), DatabaseError> {
        self.get_policy(policy_id).await?;

        let tx = self.begin().await?;
        let result = async {
            let mut removed = Vec::with_capacity(CASCADE.len());
            for table in CASCADE {
                let n = tx
                    .execute(&format!("DELETE FROM {table} WHERE policy_id = ?1"), [policy_id])
                    .await?;
                removed.push((table.to_string(), n));
            }
            tx.execute("DELETE FROM policies WHERE id = ?1", [policy_id])
                .await?;
            self.record_activity(
                &tx,
                Activity::new(None, EntityType::Policy, policy_id, ActivityAction::Deleted)
                    .with_detail(to_detail(&CascadeDetail { removed })?),
            )
            .await?;
            Ok::<_, DatabaseError>(())
        }
        .await;
        finish(tx, result).await?;

        info!(policy_id, "policy deleted");
        Ok(())
    }

    /// Policy listing with review health, relative to the current time.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_policies(&self, filter: &PolicyFilter) -> Result<Vec<PolicyListRow>, DatabaseError> {
        self.list_policies_at(filter, Utc::now()).await
    }

    pub(crate) async fn list_policies_at(
        &self,
        filter: &PolicyFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<PolicyListRow>, DatabaseError> {
        let mut w = WhereBuilder::default();
        w.text(&["p.name", "p.description"], filter.q.as_deref());
        if let Some(rel) = filter.relationship_type {
            let p = w.bind(rel.as_str());
            w.push(format!(
                "EXISTS (SELECT 1 FROM policy_controls x WHERE x.policy_id = p.id AND x.relationship_type = {p})"
            ));
        }
        match filter.has_controls {
            Some(true) => w.push("EXISTS (SELECT 1 FROM policy_controls x WHERE x.policy_id = p.id)".to_string()),
            Some(false) => w.push("NOT EXISTS (SELECT 1 FROM policy_controls x WHERE x.policy_id = p.id)".to_string()),
            None => {}
        }

        let sql = format!(
            "SELECT p.id, p.name, p.description, p.review_date, p.file_path,
                    (SELECT COUNT(*) FROM policy_controls x WHERE x.policy_id = p.id) AS linked,
                    (SELECT json_group_array(x.relationship_type) FROM policy_controls x WHERE x.policy_id = p.id)
             FROM policies p
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
            let review_date = get_opt_date(&row, 3)?;
            let review_state = ReviewState::classify(review_date, now);
            if filter.review_state.is_some_and(|wanted| wanted != review_state) {
                continue;
            }
            out.push(PolicyListRow {
                id: row.get(0)?,
                name: row.get(1)?,
                description: get_opt_string(&row, 2)?,
                review_date,
                file_path: get_opt_string(&row, 4)?,
                linked_controls: get_count(&row, 5)?,
                relationship_types: parse_relationship_types(get_list(&row, 6)?)?,
                review_state,
            });
        }
        Ok(out)
    }

    /// A policy with each linked control's status in `audit_id`.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown policy or audit.
    pub async fn get_policy_detail(
        &self,
        policy_id: &str,
        audit_id: &str,
    ) -> Result<PolicyDetail, DatabaseError> {
        let policy = self.get_policy(policy_id).await?;
        self.get_audit(audit_id).await?;

        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT pc.relationship_type, c.id, c.name,
                        cs.implementation_status, cs.testing_status,
                        EXISTS (SELECT 1 FROM control_evidence ce
                                WHERE ce.control_id = c.id AND ce.audit_id = ?2)
                 FROM policy_controls pc
                 JOIN controls c ON c.id = pc.control_id
                 LEFT JOIN control_snapshots cs ON cs.control_id = c.id AND cs.audit_id = ?2
                 WHERE pc.policy_id = ?1
                 ORDER BY pc.relationship_type, c.id",
                [policy_id, audit_id],
            )
            .await?;
        let mut linked_controls = Vec::new();
        while let Some(row) = rows.next().await? {
            let relationship_type: RelationshipType = parse_enum(&row.get::<String>(0)?)?;
            let has_evidence = get_flag(&row, 5)?;
            linked_controls.push(PolicyControlStatus {
                relationship_type,
                control_id: row.get(1)?,
                control_name: row.get(2)?,
                implementation_status: get_opt_enum(&row, 3)?,
                testing_status: get_opt_enum(&row, 4)?,
                has_evidence,
                acknowledged: relationship_type == RelationshipType::RequiresAcknowledgement
                    && has_evidence,
            });
        }

        let review_state = ReviewState::classify(policy.review_date, Utc::now());
        Ok(PolicyDetail {
            policy,
            review_state,
            linked_controls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    use crate::test_support::helpers::{seed_closed_and_active, seed_controls, test_service};
    use crate::updates::policy::PolicyUpdateBuilder;

    fn policy(name: &str, review_date: Option<NaiveDate>, controls: Vec<PolicyLink>) -> NewPolicy {
        NewPolicy {
            name: name.into(),
            review_date,
            controls,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_with_links_and_generated_id() {
        let svc = test_service().await;
        seed_controls(&svc, &["CTL-001", "CTL-002"]).await;
        let p = svc
            .create_policy(policy(
                "Access Policy",
                None,
                vec![
                    PolicyLink::new("CTL-001", RelationshipType::Fulfills),
                    PolicyLink::new("CTL-002", RelationshipType::Governs),
                    PolicyLink::new("CTL-001", RelationshipType::RequiresAcknowledgement),
                ],
            ))
            .await
            .unwrap();
        assert!(p.id.starts_with("pol-"));

        let links = svc.policy_links(&p.id).await.unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].relationship_type, RelationshipType::RequiresAcknowledgement);
    }

    #[tokio::test]
    async fn unknown_control_persists_nothing() {
        let svc = test_service().await;
        seed_controls(&svc, &["CTL-001"]).await;
        let err = svc
            .create_policy(policy(
                "P",
                None,
                vec![PolicyLink::new("CTL-404", RelationshipType::Fulfills)],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { entity: EntityType::Control, .. }));
        assert!(svc.list_policies(&PolicyFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_replaces_relationship_set() {
        let svc = test_service().await;
        seed_controls(&svc, &["CTL-001", "CTL-002", "CTL-003"]).await;
        let p = svc
            .create_policy(policy(
                "P",
                None,
                vec![
                    PolicyLink::new("CTL-001", RelationshipType::Fulfills),
                    PolicyLink::new("CTL-002", RelationshipType::Fulfills),
                ],
            ))
            .await
            .unwrap();

        svc.update_policy(
            &p.id,
            PolicyUpdateBuilder::new()
                .controls(vec![PolicyLink::new("CTL-003", RelationshipType::Governs)])
                .build(),
        )
        .await
        .unwrap();
        let ids: Vec<String> = svc
            .policy_links(&p.id)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.control_id)
            .collect();
        assert_eq!(ids, vec!["CTL-003"]);

        let err = svc
            .update_policy(
                &p.id,
                PolicyUpdateBuilder::new()
                    .name("Renamed")
                    .controls(vec![PolicyLink::new("CTL-404", RelationshipType::Governs)])
                    .build(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
        assert_eq!(svc.get_policy(&p.id).await.unwrap().name, "P");
        assert_eq!(svc.policy_links(&p.id).await.unwrap().len(), 1);

        let err = svc.update_policy(&p.id, PolicyUpdate::default()).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_cascades_links() {
        let svc = test_service().await;
        seed_controls(&svc, &["CTL-001"]).await;
        let p = svc
            .create_policy(policy(
                "P",
                None,
                vec![PolicyLink::new("CTL-001", RelationshipType::Fulfills)],
            ))
            .await
            .unwrap();
        svc.delete_policy(&p.id).await.unwrap();
        assert!(svc.find_policy(&p.id).await.unwrap().is_none());
        assert!(svc.policy_links(&p.id).await.unwrap().is_empty());
        assert!(matches!(
            svc.delete_policy(&p.id).await.unwrap_err(),
            DatabaseError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn listing_filters_by_review_state_and_links() {
        let svc = test_service().await;
        seed_controls(&svc, &["CTL-001"]).await;
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let today = now.date_naive();
        svc.create_policy(policy("Past", Some(today - Duration::days(2)), vec![])).await.unwrap();
        svc.create_policy(policy(
            "Soon",
            Some(today + Duration::days(30)),
            vec![PolicyLink::new("CTL-001", RelationshipType::Governs)],
        ))
        .await
        .unwrap();
        svc.create_policy(policy("Healthy", Some(today + Duration::days(90)), vec![])).await.unwrap();
        svc.create_policy(policy("Undated", None, vec![])).await.unwrap();

        let names = |rows: Vec<PolicyListRow>| rows.into_iter().map(|r| r.name).collect::<Vec<_>>();

        let all = svc.list_policies_at(&PolicyFilter::default(), now).await.unwrap();
        assert_eq!(names(all), vec!["Past", "Soon", "Healthy", "Undated"]);

        let soon = svc
            .list_policies_at(
                &PolicyFilter {
                    review_state: Some(ReviewState::Soon),
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap();
        assert_eq!(names(soon), vec!["Soon"]);

        let undated = svc
            .list_policies_at(
                &PolicyFilter {
                    review_state: Some(ReviewState::NoDate),
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap();
        assert_eq!(names(undated), vec!["Undated"]);

        let governs = svc
            .list_policies_at(
                &PolicyFilter {
                    relationship_type: Some(RelationshipType::Governs),
                    sort: PolicySort::Controls,
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap();
        assert_eq!(governs.len(), 1);
        assert_eq!(governs[0].relationship_types, vec![RelationshipType::Governs]);

        let unlinked = svc
            .list_policies_at(
                &PolicyFilter {
                    has_controls: Some(false),
                    sort: PolicySort::Name,
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap();
        assert_eq!(names(unlinked), vec!["Healthy", "Past", "Undated"]);
    }

    #[tokio::test]
    async fn detail_reports_acknowledgement_per_audit() {
        let svc = test_service().await;
        seed_closed_and_active(&svc).await;
        let p = svc
            .create_policy(policy(
                "Code of Conduct",
                None,
                vec![
                    PolicyLink::new("CTL-001", RelationshipType::RequiresAcknowledgement),
                    PolicyLink::new("CTL-002", RelationshipType::RequiresAcknowledgement),
                ],
            ))
            .await
            .unwrap();
        svc.db()
            .conn()
            .execute_batch(
                "INSERT INTO evidence (id, filename, file_path, uploaded_by) VALUES ('evd-1', 'ack.pdf', '/ack.pdf', 'x');
                 INSERT INTO control_evidence (control_id, evidence_id, audit_id) VALUES ('CTL-001', 'evd-1', 'FY25');",
            )
            .await
            .unwrap();

        let detail = svc.get_policy_detail(&p.id, "FY25").await.unwrap();
        assert_eq!(detail.review_state, ReviewState::NoDate);
        let acks: Vec<bool> = detail.linked_controls.iter().map(|c| c.acknowledged).collect();
        assert_eq!(acks, vec![true, false]);

        let prior = svc.get_policy_detail(&p.id, "FY24").await.unwrap();
        assert!(prior.linked_controls.iter().all(|c| !c.acknowledged));

        let err = svc.get_policy_detail(&p.id, "FY99").await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { entity: EntityType::Audit, .. }));
    }
}
