//! Presence, enum and range checks for request inputs.

use crate::error::ApiError;
use chrono::NaiveDate;

/// Date format used by the API and the database.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Require a non-blank string. Absent, null and whitespace-only all count as missing.
pub fn required_str(value: Option<&str>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
        _ => Err(ApiError::missing_field(field)),
    }
}

/// Require an id to be present.
pub fn required_id(value: Option<i64>, field: &str) -> Result<i64, ApiError> {
    value.ok_or_else(|| ApiError::missing_field(field))
}

/// Reject a supplied value that is blank. `None` passes through.
pub fn non_blank(value: Option<&str>, field: &str) -> Result<Option<String>, ApiError> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Err(ApiError::invalid_value(
            field,
            format!("'{}' must not be empty", field),
        )),
        Some(v) => Ok(Some(v.to_string())),
    }
}

/// Parse an enum value by name, listing the accepted names on failure.
pub fn parse_enum<T>(
    value: &str,
    field: &str,
    names: &[&str],
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ApiError> {
    parse(value).ok_or_else(|| {
        ApiError::invalid_value(
            field,
            format!(
                "Invalid {} '{}'; expected one of: {}",
                field,
                value,
                names.join(", ")
            ),
        )
    })
}

/// Parse an optional date. An empty string means "no date".
pub fn parse_date(value: &str, field: &str) -> Result<Option<NaiveDate>, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(Some)
        .map_err(|_| {
            ApiError::invalid_value(
                field,
                format!("Invalid {} '{}'; expected YYYY-MM-DD", field, value),
            )
        })
}

pub fn check_progress(progress: i64) -> Result<i64, ApiError> {
    if (0..=100).contains(&progress) {
        Ok(progress)
    } else {
        Err(ApiError::invalid_value(
            "progress",
            format!("progress must be between 0 and 100, got {}", progress),
        ))
    }
}
