//! Capture time from the screenshot file name (`YYYYMMDD-HHMMSS` or `YYYYMMDD_HHMMSS`).

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimestampError {
    #[error("No YYYYMMDD-HHMMSS timestamp in file name '{0}'")]
    Missing(String),

    #[error("Invalid timestamp '{value}' in file name '{file_name}'")]
    Invalid { file_name: String, value: String },
}

static TIMESTAMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{8})[-_](\d{6})").expect("valid regex"));

/// Parse the first embedded capture timestamp.
pub fn extract_collected_at(file_name: &str) -> Result<NaiveDateTime, TimestampError> {
    let caps = TIMESTAMP_RE
        .captures(file_name)
        .ok_or_else(|| TimestampError::Missing(file_name.to_string()))?;

    let value = format!("{}{}", &caps[1], &caps[2]);
    NaiveDateTime::parse_from_str(&value, "%Y%m%d%H%M%S").map_err(|_| TimestampError::Invalid {
        file_name: file_name.to_string(),
        value: caps[0].to_string(),
    })
}
