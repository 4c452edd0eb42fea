use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A trust services criterion, e.g. `CC6.1`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Criterion {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
}

impl Criterion {
    pub const DEFAULT_CATEGORY: &'static str = "Uncategorized";
    pub const DEFAULT_SUBCATEGORY: &'static str = "General";

    /// Category used for grouping, with the fallback applied.
    #[must_use]
    pub fn category_or_default(&self) -> &str {
        non_blank(self.category.as_deref()).unwrap_or(Self::DEFAULT_CATEGORY)
    }

    /// Subcategory used for grouping, with the fallback applied.
    #[must_use]
    pub fn subcategory_or_default(&self) -> &str {
        non_blank(self.subcategory.as_deref()).unwrap_or(Self::DEFAULT_SUBCATEGORY)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
