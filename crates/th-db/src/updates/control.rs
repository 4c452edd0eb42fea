//! Catalog control update builder.

use serde::Serialize;
use th_core::enums::ControlKind;

use super::SetClause;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ControlUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ControlKind>,
}

impl ControlUpdate {
    pub(crate) fn set_clause(&self) -> SetClause {
        let mut set = SetClause::default();
        if let Some(ref name) = self.name {
            set.push("name", name.clone());
        }
        if let Some(ref description) = self.description {
            set.push_opt("description", description.clone());
        }
        if let Some(ref domain) = self.domain {
            set.push_opt("domain", domain.clone());
        }
        if let Some(kind) = self.kind {
            set.push("kind", kind.as_str());
        }
        set
    }
}

pub struct ControlUpdateBuilder(ControlUpdate);

impl ControlUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(ControlUpdate::default())
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.0.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.0.description = Some(description);
        self
    }

    #[must_use]
    pub fn domain(mut self, domain: Option<String>) -> Self {
        self.0.domain = Some(domain);
        self
    }

    #[must_use]
    pub const fn kind(mut self, kind: ControlKind) -> Self {
        self.0.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn build(self) -> ControlUpdate {
        self.0
    }
}

impl Default for ControlUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
