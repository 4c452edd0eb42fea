//! Flag parsing. Bad values surface as store validation errors so they map
//! to the `invalid` label and exit code 2.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use th_db::error::DatabaseError;

fn invalid(field: &str, raw: &str, reason: impl std::fmt::Display) -> anyhow::Error {
    DatabaseError::Validation(format!("invalid {field} '{raw}': {reason}")).into()
}

/// Parse an enum from its `snake_case` name; hyphens are accepted too.
pub fn parse_enum<T>(raw: &str, field: &str) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let normalized = raw.trim().replace('-', "_");
    let json = serde_json::Value::String(normalized);
    serde_json::from_value(json).map_err(|error| invalid(field, raw, error))
}

pub fn parse_opt_enum<T>(raw: Option<&str>, field: &str) -> anyhow::Result<Option<T>>
where
    T: DeserializeOwned,
{
    raw.map(|value| parse_enum(value, field)).transpose()
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(raw: &str, field: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|error| invalid(field, raw, error))
}

pub fn parse_opt_date(raw: Option<&str>, field: &str) -> anyhow::Result<Option<NaiveDate>> {
    raw.map(|value| parse_date(value, field)).transpose()
}

/// A date patch: absent leaves the field alone, blank clears it.
pub fn date_patch(raw: Option<&str>, field: &str) -> anyhow::Result<Option<Option<NaiveDate>>> {
    raw.map(|value| {
        if value.trim().is_empty() {
            Ok(None)
        } else {
            parse_date(value, field).map(Some)
        }
    })
    .transpose()
}

/// A text patch: absent leaves the field alone, blank clears it.
#[must_use]
pub fn text_patch(raw: Option<&str>) -> Option<Option<String>> {
    raw.map(|value| {
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

pub fn parse_timestamp(raw: &str, field: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|error| invalid(field, raw, error))
}
