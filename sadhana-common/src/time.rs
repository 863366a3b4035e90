//! Form timestamp parsing
//!
//! Submission timestamps arrive as `locale-date locale-time period-marker`
//! strings, e.g. `12/31/2023 10:05:03 PM` or `31/12/2023 10:05:03 μ.μ.`.
//! The period marker disambiguates AM/PM using either the Latin markers or
//! the Greek morning/afternoon markers the sheet locale produces.
//! Timestamps that fail to parse resolve to 0 so they sort as earliest.

use chrono::{NaiveDateTime, Timelike};

const DATETIME_FORMATS: [&str; 6] = [
    "%m/%d/%Y %I:%M:%S",
    "%d/%m/%Y %I:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M",
];

/// Parse a form timestamp into epoch milliseconds
///
/// Returns 0 for anything unparseable.
pub fn parse_form_timestamp(raw: &str) -> i64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0;
    }

    let mut parts: Vec<&str> = trimmed.split_whitespace().collect();
    let period = parts.last().and_then(|tok| period_marker(tok));
    if period.is_some() {
        parts.pop();
    }
    let datetime = parts.join(" ");

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&datetime, format) {
            return apply_period(naive, period).and_utc().timestamp_millis();
        }
    }

    0
}

/// Recognize a trailing AM/PM marker: Some(true) = afternoon
fn period_marker(token: &str) -> Option<bool> {
    let normalized: String = token.chars().filter(|c| *c != '.').collect();
    let upper = normalized.to_uppercase();
    match upper.as_str() {
        "AM" => Some(false),
        "PM" => Some(true),
        // Greek sheet locales export π.μ. (before midday) / μ.μ. (after midday)
        "ΠΜ" => Some(false),
        "ΜΜ" => Some(true),
        _ => None,
    }
}

fn apply_period(naive: NaiveDateTime, period: Option<bool>) -> NaiveDateTime {
    match period {
        Some(true) if naive.hour() < 12 => naive + chrono::Duration::hours(12),
        Some(false) if naive.hour() == 12 => naive - chrono::Duration::hours(12),
        _ => naive,
    }
}
