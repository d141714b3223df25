//! Export time parsing
//!
//! Forensic exports carry timestamps in a handful of formats, optionally
//! prefixed with a `[Start time]` / `[End time]` marker and suffixed with a
//! `(UTC-5)`-style timezone tag. This module turns those strings into a
//! canonical UTC instant plus the start/end annotation.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;

use crate::types::TimeAnnotation;

/// Known export time formats, tried in order
const TIME_FORMATS: &[&str] = &["%m/%d/%Y %I:%M:%S %p", "%m/%d/%Y %H:%M:%S"];

/// Date-only fallback format
const DATE_FORMAT: &str = "%m/%d/%Y";

/// A parsed export time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedTime {
    pub timestamp: DateTime<Utc>,
    pub annotation: Option<TimeAnnotation>,
}

fn timezone_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(UTC[+-]\d+\)").unwrap())
}

fn bracket_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[.*?\]").unwrap())
}

/// Parse an export time string.
///
/// Detects a `[Start time]` / `[End time]` marker, strips the timezone
/// suffix and any bracketed tokens, then tries each known format in order.
/// Returns None when no format matches; callers skip the row.
pub fn parse_export_time(raw: &str) -> Option<ParsedTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let annotation = if raw.contains("[Start time]") {
        Some(TimeAnnotation::Start)
    } else if raw.contains("[End time]") {
        Some(TimeAnnotation::End)
    } else {
        None
    };

    let clean = timezone_suffix_re().replace_all(raw, "");
    let clean = bracket_token_re().replace_all(&clean, "");
    let clean = clean.trim();

    for fmt in TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(clean, fmt) {
            return Some(ParsedTime {
                timestamp: to_utc(dt),
                annotation,
            });
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(clean, DATE_FORMAT) {
        let dt = date.and_hms_opt(0, 0, 0)?;
        return Some(ParsedTime {
            timestamp: to_utc(dt),
            annotation,
        });
    }

    None
}

/// Export times are already normalized to UTC by the export tool
fn to_utc(dt: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&dt)
}
