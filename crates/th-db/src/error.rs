//! Database error types for th-db.

use th_core::enums::EntityType;
use th_core::errors::ErrorKind;
use thiserror::Error;

/// Errors from database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Input failed validation before any SQL ran.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: EntityType, id: String },

    /// A write was attempted against a closed audit.
    #[error("Audit '{audit_id}' is closed and read-only")]
    AuditClosed { audit_id: String },

    /// Close was requested for an audit that is already closed.
    #[error("Audit '{audit_id}' is already closed")]
    AuditAlreadyClosed { audit_id: String },

    /// A new active audit was requested while another is active.
    #[error("Audit '{audit_id}' is still active; close it before starting another")]
    ActiveAuditExists { audit_id: String },

    /// No closed audit exists to clone snapshot state from.
    #[error("No closed audit to clone from")]
    NoCloneSource,

    /// An entity with this ID already exists.
    #[error("{entity} '{id}' already exists")]
    AlreadyExists { entity: EntityType, id: String },

    /// A cross-entity consistency check failed.
    #[error("Integrity check failed: {0}")]
    Integrity(String),

    /// A SQL query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// Invalid state encountered (e.g., bad data in DB).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DatabaseError {
    pub(crate) fn not_found(entity: EntityType, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn already_exists(entity: EntityType, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity,
            id: id.into(),
        }
    }

    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AuditClosed { .. }
            | Self::AuditAlreadyClosed { .. }
            | Self::ActiveAuditExists { .. }
            | Self::NoCloneSource
            | Self::AlreadyExists { .. } => ErrorKind::Conflict,
            Self::Integrity(_) => ErrorKind::Integrity,
            Self::Query(_)
            | Self::Migration(_)
            | Self::NoResult
            | Self::InvalidState(_)
            | Self::LibSql(_)
            | Self::Other(_) => ErrorKind::Internal,
        }
    }

    /// Short label for message prefixes. Duplicates read as `exists`, other
    /// conflicts as `locked`.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::AlreadyExists { .. } | Self::ActiveAuditExists { .. } => "exists",
            other => other.kind().label(),
        }
    }
}
