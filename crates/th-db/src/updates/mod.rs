//! Update builder types for entity mutations.
//!
//! Each builder produces an update struct with `Option` fields. Only `Some`
//! fields generate SET clauses in the dynamic UPDATE SQL, so the set of
//! writable columns is fixed by the struct definition. The builder output is
//! serialized as the activity `detail` payload (changed fields only).

pub mod control;
pub mod evidence;
pub mod policy;
pub mod request;
pub mod snapshot;

/// Accumulates `column = ?N` assignments and their parameters.
#[derive(Debug, Default)]
pub(crate) struct SetClause {
    sets: Vec<String>,
    params: Vec<libsql::Value>,
}

impl SetClause {
    pub(crate) fn push(&mut self, column: &str, value: impl Into<libsql::Value>) {
        self.params.push(value.into());
        self.sets.push(format!("{column} = ?{}", self.params.len()));
    }

    pub(crate) fn push_opt<T: Into<libsql::Value>>(&mut self, column: &str, value: Option<T>) {
        self.push(column, crate::helpers::opt_value(value));
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Render `UPDATE {table} SET ... WHERE k1 = ? AND k2 = ?` with all params.
    pub(crate) fn into_statement(
        mut self,
        table: &str,
        keys: &[(&str, &str)],
    ) -> (String, Vec<libsql::Value>) {
        let mut conditions = Vec::with_capacity(keys.len());
        for (column, value) in keys {
            self.params.push((*value).into());
            conditions.push(format!("{column} = ?{}", self.params.len()));
        }
        let sql = format!(
            "UPDATE {table} SET {} WHERE {}",
            self.sets.join(", "),
            conditions.join(" AND ")
        );
        (sql, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_numbered_params_in_order() {
        let mut set = SetClause::default();
        set.push("owner", "Jane");
        set.push_opt::<String>("notes", None);
        let (sql, params) = set.into_statement("control_snapshots", &[("control_id", "CTL-001"), ("audit_id", "FY25")]);
        assert_eq!(
            sql,
            "UPDATE control_snapshots SET owner = ?1, notes = ?2 WHERE control_id = ?3 AND audit_id = ?4"
        );
        assert_eq!(params.len(), 4);
        assert_eq!(params[1], libsql::Value::Null);
    }
}
