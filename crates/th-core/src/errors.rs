//! Error kind taxonomy shared by every Trust Hub crate.
//!
//! Concrete errors (`DatabaseError`, `ConfigError`) live in their own crates
//! and map onto an [`ErrorKind`] so that outer surfaces can decide how to
//! render them without matching on every variant.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input or an empty patch.
    Validation,
    /// A referenced audit or entity does not exist.
    NotFound,
    /// The operation conflicts with current state: a closed audit, an
    /// already-active audit, a duplicate ID.
    Conflict,
    /// A cross-entity consistency check failed.
    Integrity,
    /// Storage or unexpected failure.
    Internal,
}

impl ErrorKind {
    /// Short label used as a message prefix by the CLI.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Validation => "invalid",
            Self::NotFound => "missing",
            Self::Conflict => "locked",
            Self::Integrity => "integrity",
            Self::Internal => "internal",
        }
    }

    /// Process exit code for this kind.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Validation => 2,
            Self::NotFound => 3,
            Self::Conflict => 4,
            Self::Integrity => 5,
            Self::Internal => 1,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
