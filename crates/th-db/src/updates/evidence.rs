//! Evidence update builder. Global fields only; links are managed separately.

use serde::Serialize;

use super::SetClause;

#[derive(Debug, Clone, Default, Serialize)]
pub struct EvidenceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

impl EvidenceUpdate {
    pub(crate) fn set_clause(&self) -> SetClause {
        let mut set = SetClause::default();
        if let Some(ref filename) = self.filename {
            set.push("filename", filename.clone());
        }
        if let Some(ref file_path) = self.file_path {
            set.push("file_path", file_path.clone());
        }
        if let Some(ref file_type) = self.file_type {
            set.push("file_type", file_type.trim().to_lowercase());
        }
        if let Some(file_size) = self.file_size {
            set.push_opt("file_size", file_size);
        }
        if let Some(ref description) = self.description {
            set.push_opt("description", description.clone());
        }
        set
    }
}

pub struct EvidenceUpdateBuilder(EvidenceUpdate);

impl EvidenceUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(EvidenceUpdate::default())
    }

    #[must_use]
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.0.filename = Some(filename.into());
        self
    }

    #[must_use]
    pub fn file_path(mut self, file_path: impl Into<String>) -> Self {
        self.0.file_path = Some(file_path.into());
        self
    }

    #[must_use]
    pub fn file_type(mut self, file_type: impl Into<String>) -> Self {
        self.0.file_type = Some(file_type.into());
        self
    }

    #[must_use]
    pub const fn file_size(mut self, file_size: Option<i64>) -> Self {
        self.0.file_size = Some(file_size);
        self
    }

    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.0.description = Some(description);
        self
    }

    #[must_use]
    pub fn build(self) -> EvidenceUpdate {
        self.0
    }
}

impl Default for EvidenceUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
