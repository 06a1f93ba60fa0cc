use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::borrow::Cow;
use tracing::trace;

pub const DISPLAY_FORMAT: &str = "%d-%m-%Y";
pub const INPUT_FORMAT: &str = "%Y-%m-%d";

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Parse the date part of any supported date or datetime string.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    {
        return Some(d);
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.date());
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Render a stored date as `DD-MM-YYYY`. Values that are not dates are
/// returned unchanged.
pub fn format_date(raw: &str) -> Cow<'_, str> {
    match parse_date(raw) {
        Some(d) => Cow::Owned(d.format(DISPLAY_FORMAT).to_string()),
        None => {
            if !raw.is_empty() {
                trace!("Invalid date format: {raw}");
            }
            Cow::Borrowed(raw)
        }
    }
}

/// Render a stored date as `YYYY-MM-DD` for editing.
pub fn normalize_date_input(raw: &str) -> Cow<'_, str> {
    match parse_date(raw) {
        Some(d) => Cow::Owned(d.format(INPUT_FORMAT).to_string()),
        None => Cow::Borrowed(raw),
    }
}
