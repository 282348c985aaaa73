use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::ServiceError;

/// Parameters for list/query operations.
#[derive(Debug, Clone, Deserialize)]
pub struct ListParams {
    /// Maximum number of results to return.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Offset for pagination.
    #[serde(default)]
    pub offset: usize,

    /// Optional status filter (SCREAMING_SNAKE value).
    #[serde(default)]
    pub status: Option<String>,

    /// Free-text filter.
    #[serde(default)]
    pub q: Option<String>,
}

fn default_limit() -> usize {
    50
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
            status: None,
            q: None,
        }
    }
}

/// Result wrapper for list operations.
#[derive(Debug, Clone, Serialize)]
pub struct ListResult<T: Serialize> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Generate a new random ID (UUIDv4, no dashes).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string().replace('-', "")
}

/// Current time as RFC 3339 with fixed microsecond precision and a `Z`
/// suffix, so stored timestamps compare correctly as strings.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Today's date in UTC.
pub fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Trim a required text input, rejecting blanks.
pub fn required(field: &str, value: &str) -> Result<String, ServiceError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(ServiceError::Validation(format!("{} is required", field)));
    }
    Ok(v.to_string())
}

/// A required reference code (SKU code, PO or quotation number). Codes end
/// up in blob keys and download file names, so only ASCII letters, digits
/// and `-_./` are accepted, and no `/`-separated segment may be empty, `.`
/// or `..`.
pub fn code(field: &str, value: &str) -> Result<String, ServiceError> {
    let v = required(field, value)?;
    let chars_ok = v
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'));
    let segments_ok = v.split('/').all(|s| !matches!(s, "" | "." | ".."));
    if !chars_ok || !segments_ok {
        return Err(ServiceError::Validation(format!(
            "{} may only contain letters, digits and -_./",
            field
        )));
    }
    Ok(v)
}

/// Trim an optional text input; blanks become `None`.
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Format a whole-rupiah amount with dot thousands separators: `Rp 1.500.000`.
pub fn format_rupiah(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("Rp -{}", grouped)
    } else {
        format!("Rp {}", grouped)
    }
}
