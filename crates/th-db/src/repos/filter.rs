//! Dynamic WHERE clause assembly shared by the listing queries.

/// Collects conditions and numbered parameters for a listing query.
#[derive(Debug, Default)]
pub(crate) struct WhereBuilder {
    conditions: Vec<String>,
    params: Vec<libsql::Value>,
}

impl WhereBuilder {
    /// Bind a parameter and return its placeholder.
    pub(crate) fn bind(&mut self, value: impl Into<libsql::Value>) -> String {
        self.params.push(value.into());
        format!("?{}", self.params.len())
    }

    pub(crate) fn push(&mut self, condition: String) {
        self.conditions.push(condition);
    }

    /// `column = value`.
    pub(crate) fn eq(&mut self, column: &str, value: impl Into<libsql::Value>) {
        let p = self.bind(value);
        self.push(format!("{column} = {p}"));
    }

    /// Case-insensitive substring match over any of `columns`. Blank needles
    /// add nothing. SQLite `lower()` folds ASCII letters only, so `Ü` and `ü`
    /// do not match each other.
    pub(crate) fn text(&mut self, columns: &[&str], needle: Option<&str>) {
        let Some(needle) = needle.map(str::trim).filter(|n| !n.is_empty()) else {
            return;
        };
        let p = self.bind(needle.to_string());
        let any = columns
            .iter()
            .map(|c| format!("instr(lower(COALESCE({c}, '')), lower({p})) > 0"))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.push(format!("({any})"));
    }

    /// `WHERE a AND b`, or empty when there are no conditions.
    pub(crate) fn clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub(crate) fn into_params(self) -> Vec<libsql::Value> {
        self.params
    }
}
