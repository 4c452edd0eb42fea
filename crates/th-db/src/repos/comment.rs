//! Comment repository. Comments are append-only and gated by their
//! request's audit.

use chrono::Utc;
use tracing::debug;

use th_core::entities::Comment;
use th_core::enums::{ActivityAction, EntityType};
use th_core::ids::PREFIX_COMMENT;

use crate::error::DatabaseError;
use crate::gateway::recheck_writable;
use crate::helpers::{get_flag, parse_datetime, require_non_blank};
use crate::repos::activity::Activity;
use crate::service::{TrustHubService, finish};

/// Input for [`TrustHubService::create_comment`].
#[derive(Debug, Clone, Default)]
pub struct NewComment {
    pub request_id: String,
    /// Falls back to the service's display user when absent.
    pub author: Option<String>,
    pub body: String,
    pub visible_to_auditor: bool,
}

fn row_to_comment(row: &libsql::Row) -> Result<Comment, DatabaseError> {
    Ok(Comment {
        id: row.get(0)?,
        request_id: row.get(1)?,
        author: row.get(2)?,
        body: row.get(3)?,
        visible_to_auditor: get_flag(row, 4)?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}

impl TrustHubService {
    /// Append a comment to a request.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank body or author, `NotFound` for an unknown
    /// request, `AuditClosed` when the request's audit is closed.
    pub async fn create_comment(&self, input: NewComment) -> Result<Comment, DatabaseError> {
        let body = require_non_blank("comment body", &input.body)?.to_string();
        let author = require_non_blank("author", input.author.as_deref().unwrap_or(self.actor()))?
            .to_string();
        let request = self.ensure_request_writable(&input.request_id).await?;

        let tx = self.begin().await?;
        let result = async {
            recheck_writable(&tx, &request.audit_id).await?;
            let comment = Comment {
                id: crate::generate_id(&tx, PREFIX_COMMENT).await?,
                request_id: request.id.clone(),
                author,
                body,
                visible_to_auditor: input.visible_to_auditor,
                created_at: Utc::now(),
            };
            tx.execute(
                "INSERT INTO comments (id, request_id, author, body, visible_to_auditor, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                libsql::params![
                    comment.id.as_str(),
                    comment.request_id.as_str(),
                    comment.author.as_str(),
                    comment.body.as_str(),
                    i64::from(comment.visible_to_auditor),
                    comment.created_at.to_rfc3339()
                ],
            )
            .await?;
            self.record_activity(
                &tx,
                Activity::new(
                    Some(&request.audit_id),
                    EntityType::Comment,
                    &comment.id,
                    ActivityAction::Created,
                )
                .with_detail(serde_json::json!({ "request_id": request.id })),
            )
            .await?;
            Ok::<_, DatabaseError>(comment)
        }
        .await;
        let comment = finish(tx, result).await?;

        debug!(comment_id = %comment.id, request_id = %comment.request_id, "comment added");
        Ok(comment)
    }

    /// Comments of a request, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_comments(&self, request_id: &str) -> Result<Vec<Comment>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT id, request_id, author, body, visible_to_auditor, created_at
                 FROM comments WHERE request_id = ?1 ORDER BY created_at, id",
                [request_id],
            )
            .await?;
        let mut comments = Vec::new();
        while let Some(row) = rows.next().await? {
            comments.push(row_to_comment(&row)?);
        }
        Ok(comments)
    }
}
