//! Run-identifier timestamp parsing and ISO-8601 helpers.
//!
//! Run identifiers are free-form labels. Many projects name runs after the
//! moment they started, so resolution first tries to read the identifier
//! itself as a calendar instant; backend provenance is the fallback.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;
use std::sync::OnceLock;

/// Datetime layouts accepted for run identifiers, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y%m%dT%H%M%S",
    "%Y%m%dT%H%M%S%.f",
    "%Y%m%d%H%M%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Date-only layouts; midnight is assumed.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d"];

fn date_gate() -> &'static Regex {
    static GATE: OnceLock<Regex> = OnceLock::new();
    // Year-month-day prefix, optionally followed by a time part.
    GATE.get_or_init(|| Regex::new(r"^\d{4}[-/]?\d{2}[-/]?\d{2}([T ].+)?$").unwrap())
}

/// Parse a run identifier as a calendar instant, normalized to ISO-8601.
///
/// Offset-bearing identifiers (RFC 3339) keep their offset. Naive
/// identifiers normalize to `%Y-%m-%dT%H:%M:%S`, with a fractional part
/// only when one was present and non-zero. Returns `None` when the
/// identifier is not a date-like string.
pub fn parse_run_time(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.to_rfc3339());
    }
    if !date_gate().is_match(raw) {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(format_naive(parsed));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(raw, format) {
            return Some(format_naive(parsed.and_time(NaiveTime::MIN)));
        }
    }
    None
}

fn format_naive(instant: NaiveDateTime) -> String {
    if instant.nanosecond() == 0 {
        instant.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        instant.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
    }
}
