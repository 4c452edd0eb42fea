//! Service layer owning the store handle and the acting user.
//!
//! `TrustHubService` wraps `TrustHubDb`. All repo methods are implemented as
//! `impl TrustHubService` blocks under `repos/`.

use tracing::warn;

use crate::TrustHubDb;
use crate::error::DatabaseError;

/// Entry point for every Trust Hub operation.
///
/// Every multi-row mutation follows this protocol:
/// 1. Validate input and pass the audit gate
/// 2. Begin transaction
/// 3. Execute SQL
/// 4. Append activity entry (inside transaction)
/// 5. Commit, or roll back on any error
pub struct TrustHubService {
    db: TrustHubDb,
    actor: String,
}

impl TrustHubService {
    /// Open a local database and wrap it.
    ///
    /// # Arguments
    ///
    /// * `db_path` - Path to the libSQL database file, or `":memory:"` for tests.
    /// * `actor` - Display user recorded on activity entries and used as the
    ///   default uploader.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new_local(db_path: &str, actor: impl Into<String>) -> Result<Self, DatabaseError> {
        let db = TrustHubDb::open_local(db_path).await?;
        Ok(Self::from_db(db, actor))
    }

    /// Create from an existing `TrustHubDb`.
    #[must_use]
    pub fn from_db(db: TrustHubDb, actor: impl Into<String>) -> Self {
        Self {
            db,
            actor: actor.into(),
        }
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &TrustHubDb {
        &self.db
    }

    /// Display user recorded on writes.
    #[must_use]
    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Begin an immediate transaction on the service connection. The write
    /// lock is held from the first statement, so gateway rechecks inside it
    /// cannot be overtaken by another writer.
    pub(crate) async fn begin(&self) -> Result<libsql::Transaction, DatabaseError> {
        Ok(self
            .db
            .conn()
            .transaction_with_behavior(libsql::TransactionBehavior::Immediate)
            .await?)
    }
}

/// Commit `tx` when `result` is `Ok`, roll it back otherwise.
///
/// A failed rollback is logged; the original error is the one returned.
pub(crate) async fn finish<T>(
    tx: libsql::Transaction,
    result: Result<T, DatabaseError>,
) -> Result<T, DatabaseError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
