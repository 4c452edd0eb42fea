use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An evidence file reference. The file itself is never read.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Evidence {
    pub id: String,
    pub filename: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: Option<i64>,
    pub description: Option<String>,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

impl Evidence {
    pub const UNKNOWN_FILE_TYPE: &'static str = "unknown";

    /// File type derived from the filename extension, lowercased.
    ///
    /// Returns `"unknown"` when the name has no usable extension.
    #[must_use]
    pub fn infer_file_type(filename: &str) -> String {
        filename
            .rsplit_once('.')
            .map(|(stem, ext)| (stem, ext.trim()))
            .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
            .map_or_else(
                || Self::UNKNOWN_FILE_TYPE.to_string(),
                |(_, ext)| ext.to_lowercase(),
            )
    }
}
