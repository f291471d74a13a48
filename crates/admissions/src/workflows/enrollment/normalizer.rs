use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};

/// Earliest year accepted as a birthdate; anything older is a mis-typed cell.
const MIN_YEAR: i32 = 1900;

/// Two-digit-year formats are tried first; `%y` refuses four-digit years so these never shadow the rest.
const SHORT_YEAR_FORMATS: &[&str] = &["%m/%d/%y", "%m-%d-%y"];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Trimmed, lower-cased cell value used for identity comparison.
pub(crate) fn normalize_value(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned.trim().to_lowercase()
}

/// Header key with every non-alphanumeric character stripped.
pub(crate) fn header_key(value: &str) -> String {
    value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    parse_any_date(value).filter(|date| date.year() >= MIN_YEAR)
}

fn parse_any_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }

    if let Some(date) = SHORT_YEAR_FORMATS
        .iter()
        .chain(DATE_FORMATS)
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
    {
        return Some(date);
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|dt| dt.date())
}

/// Canonical `YYYY-MM-DD` key, empty when the value is blank or unparseable.
pub(crate) fn date_key(value: &str) -> String {
    parse_date(value).map(format_date_key).unwrap_or_default()
}

pub(crate) fn format_date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
