//! Criteria coverage classification.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of rows the dashboard attention list is capped at.
pub const ATTENTION_LIMIT: u32 = 20;

/// Whether a criterion's mapped controls have evidence in an audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CoverageState {
    /// No controls mapped.
    Uncovered,
    /// Some, but not all, mapped controls have evidence.
    Partial,
    /// Every mapped control has evidence.
    Covered,
}

impl CoverageState {
    /// Classify from the number of mapped controls and how many of them have
    /// at least one piece of evidence in the audit.
    #[must_use]
    pub const fn classify(mapped_controls: u32, controls_with_evidence: u32) -> Self {
        if mapped_controls == 0 {
            Self::Uncovered
        } else if controls_with_evidence >= mapped_controls {
            Self::Covered
        } else {
            Self::Partial
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uncovered => "uncovered",
            Self::Partial => "partial",
            Self::Covered => "covered",
        }
    }
}

impl fmt::Display for CoverageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
