//! Mutation gateway: the audit-status check in front of every audit-scoped write.
//!
//! Snapshot patches, request and comment writes, and audit-scoped evidence
//! links call [`TrustHubService::ensure_audit_writable`] before touching
//! storage, then `recheck_writable` as the first statement of their write
//! transaction so a close committed in between is still seen. Policies,
//! global evidence fields, and catalog edits bypass it.

use tracing::{debug, warn};

use th_core::entities::{Audit, Request};
use th_core::enums::{AuditStatus, EntityType};

use crate::error::DatabaseError;
use crate::helpers::parse_enum;
use crate::service::TrustHubService;

impl TrustHubService {
    /// Resolve `audit_id` and require it to be active.
    ///
    /// # Errors
    ///
    /// `NotFound` when the audit does not exist, `AuditClosed` when it is
    /// closed.
    pub async fn ensure_audit_writable(&self, audit_id: &str) -> Result<Audit, DatabaseError> {
        let audit = self.get_audit(audit_id).await?;
        if audit.is_read_only() {
            warn!(audit_id, "write rejected: audit is closed");
            return Err(DatabaseError::AuditClosed {
                audit_id: audit.id,
            });
        }
        debug!(audit_id, "audit writable");
        Ok(audit)
    }

    /// Resolve a request and require its own audit to be active.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown request, otherwise as
    /// [`Self::ensure_audit_writable`].
    pub async fn ensure_request_writable(&self, request_id: &str) -> Result<Request, DatabaseError> {
        let request = self.get_request(request_id).await?;
        self.ensure_audit_writable(&request.audit_id).await?;
        Ok(request)
    }
}

/// Status check on an open transaction.
///
/// # Errors
///
/// `NotFound` when the audit is gone, `AuditClosed` when it is closed.
pub(crate) async fn recheck_writable(
    conn: &libsql::Connection,
    audit_id: &str,
) -> Result<(), DatabaseError> {
    let mut rows = conn
        .query("SELECT status FROM audits WHERE id = ?1", [audit_id])
        .await?;
    let Some(row) = rows.next().await? else {
        return Err(DatabaseError::not_found(EntityType::Audit, audit_id));
    };
    let status: AuditStatus = parse_enum(&row.get::<String>(0)?)?;
    if status.is_read_only() {
        warn!(audit_id, "write rejected: audit closed before commit");
        return Err(DatabaseError::AuditClosed {
            audit_id: audit_id.to_string(),
        });
    }
    Ok(())
}
