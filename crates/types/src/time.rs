//! Timestamp canonicalisation for HL7 TS fields and ebXML time slots.
//!
//! Both wire formats carry the same `YYYYMMDDHHMMSS` shape. Conversion is
//! deliberately forgiving: anything ISO8601-shaped is reformatted, and
//! everything else degrades to digit extraction rather than failing, so a
//! timestamp can never abort an encode.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// HL7 TS render of the current UTC time.
pub fn hl7_now() -> String {
    Utc::now().format("%Y%m%d%H%M%S").to_string()
}

/// Convert a caller-supplied timestamp to HL7 TS format.
///
/// Absent input yields the current UTC time. ISO8601 input (extended or
/// basic, `Z` treated as UTC) is reformatted preserving its own offset's
/// wall-clock fields. Anything else is reduced to its digits, truncated to
/// 14 characters. This function never fails.
pub fn to_hl7_timestamp(value: Option<&str>) -> String {
    let Some(raw) = value else {
        return hl7_now();
    };
    if raw.is_empty() {
        return hl7_now();
    }
    match parse_iso8601(raw) {
        Some(formatted) => formatted,
        None => {
            let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
            digits.chars().take(14).collect()
        }
    }
}

/// Normalise a date of birth to its 8-digit date component.
///
/// Everything from the first `T` (the time component) is dropped, `-` and
/// `:` separators are stripped, and the result is truncated to 8 characters.
/// Empty input passes through unchanged.
pub fn normalize_dob(value: &str) -> String {
    let date_part = value.find('T').map_or(value, |idx| &value[..idx]);
    date_part
        .chars()
        .filter(|c| *c != '-' && *c != ':')
        .take(8)
        .collect()
}

/// Whether `value` parses as an ISO8601 timestamp (extended or basic form).
pub fn is_iso8601(value: &str) -> bool {
    parse_iso8601(value).is_some()
}

/// Parse an ISO8601 timestamp and render it as HL7 TS.
///
/// Rendering keeps the wall-clock fields of the input's own offset; only the
/// accepted *shapes* are normalised here, not the zone.
fn parse_iso8601(value: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.format("%Y%m%d%H%M%S").to_string());
    }
    let naive = value.strip_suffix('Z').unwrap_or(value);
    if let Ok(dt) = NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.format("%Y%m%d%H%M%S").to_string());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(naive, "%Y%m%dT%H%M%S") {
        return Some(dt.format("%Y%m%d%H%M%S").to_string());
    }
    if let Ok(d) = NaiveDate::parse_from_str(naive, "%Y-%m-%d") {
        return Some(format!("{}000000", d.format("%Y%m%d")));
    }
    None
}
