//! Row-to-entity parsing helpers.
//!
//! Every repo needs to convert `libsql::Row` (column-indexed) into typed entity
//! structs. These helpers isolate the parsing logic and handle the dual datetime
//! format issue (`SQLite`'s `datetime('now')` vs Rust's `to_rfc3339()`).

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::DatabaseError;

/// Parse a required TEXT column as `DateTime<Utc>`.
///
/// Handles both RFC 3339 (`"2026-02-09T14:30:00+00:00"`) and `SQLite`'s default
/// format (`"2026-02-09 14:30:00"`).
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string cannot be parsed as either format.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Query(format!("Failed to parse datetime '{s}': {e}")))
}

/// Parse an optional TEXT column as `Option<DateTime<Utc>>`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if a non-empty string cannot be parsed.
pub fn parse_optional_datetime(s: Option<&str>) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(parse_datetime(s)?)),
        _ => Ok(None),
    }
}

/// Parse a `YYYY-MM-DD` TEXT column.
///
/// Also accepts a full timestamp and keeps its date part, since imported rows
/// sometimes carry one.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string is not a date.
pub fn parse_date(s: &str) -> Result<NaiveDate, DatabaseError> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    parse_datetime(s)
        .map(|dt| dt.date_naive())
        .map_err(|_| DatabaseError::Query(format!("Failed to parse date '{s}'")))
}

/// Read a nullable date column.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails or holds a non-date.
pub fn get_opt_date(row: &libsql::Row, idx: i32) -> Result<Option<NaiveDate>, DatabaseError> {
    get_opt_string(row, idx)?.as_deref().map(parse_date).transpose()
}

/// Format a date for storage.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a TEXT column into a serde-deserializable enum.
///
/// Works with every th-core enum, whether it serializes as `snake_case` or as
/// a display label.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string does not match any enum variant.
pub fn parse_enum<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, DatabaseError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|e| DatabaseError::Query(format!("Failed to parse enum from '{s}': {e}")))
}

/// Read a nullable enum column.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails or holds an unknown value.
pub fn get_opt_enum<T: serde::de::DeserializeOwned>(
    row: &libsql::Row,
    idx: i32,
) -> Result<Option<T>, DatabaseError> {
    get_opt_string(row, idx)?.as_deref().map(parse_enum).transpose()
}

/// Read a nullable TEXT column. Returns `None` for both SQL NULL and empty string.
///
/// `row.get::<String>(idx)` on a NULL column returns an error, not `""`.
/// You must use `get::<Option<String>>()` for nullable columns.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row.get::<Option<String>>(idx)? {
        Some(s) if s.is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// Read an aggregate count column as `u32`.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails or the value is negative.
pub fn get_count(row: &libsql::Row, idx: i32) -> Result<u32, DatabaseError> {
    let value = row.get::<Option<i64>>(idx)?.unwrap_or(0);
    u32::try_from(value)
        .map_err(|_| DatabaseError::InvalidState(format!("count out of range: {value}")))
}

/// Read an integer flag column (`0`/`1`) as `bool`.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_flag(row: &libsql::Row, idx: i32) -> Result<bool, DatabaseError> {
    Ok(row.get::<Option<i64>>(idx)?.unwrap_or(0) != 0)
}

/// Decode a `json_group_array` column. NULL gives an empty list.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the column is not a JSON string array.
pub fn get_list(row: &libsql::Row, idx: i32) -> Result<Vec<String>, DatabaseError> {
    get_opt_string(row, idx)?.map_or_else(
        || Ok(Vec::new()),
        |raw| {
            serde_json::from_str(&raw)
                .map_err(|e| DatabaseError::Query(format!("invalid list column {idx}: {e}")))
        },
    )
}

/// Extract an optional JSON value from a TEXT column.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if a non-empty string contains invalid JSON.
pub fn parse_optional_json(s: Option<&str>) -> Result<Option<serde_json::Value>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => {
            let val = serde_json::from_str(s)
                .map_err(|e| DatabaseError::Query(format!("Invalid JSON in column: {e}")))?;
            Ok(Some(val))
        }
        _ => Ok(None),
    }
}

/// Serialize a payload for the activity `detail` column.
///
/// # Errors
///
/// Returns `DatabaseError::Other` if serialization fails.
pub fn to_detail<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, DatabaseError> {
    serde_json::to_value(value).map_err(|e| DatabaseError::Other(e.into()))
}

/// Trim `value` and reject it when blank.
///
/// # Errors
///
/// Returns `DatabaseError::Validation` naming `field`.
pub fn require_non_blank<'a>(field: &str, value: &'a str) -> Result<&'a str, DatabaseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DatabaseError::Validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

/// Convert an optional value into a SQL parameter, mapping `None` to NULL.
pub fn opt_value<T: Into<libsql::Value>>(value: Option<T>) -> libsql::Value {
    value.map_or(libsql::Value::Null, Into::into)
}

/// Current UTC date, used for staleness comparisons.
#[must_use]
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
