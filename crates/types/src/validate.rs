//! Input-shape validators for the XDS submission path.
//!
//! These run before any encoding starts; a failure here is terminal and is
//! reported verbatim to the caller. The shapes are simple anchored checks,
//! so they are expressed directly over the string rather than with a regex
//! engine.

use crate::time::is_iso8601;
use crate::{ValidationError, HEALTH_ID_OID, NATIONAL_ORG_ROOT};

/// Validate an XDS-format patient id and return its trimmed form.
///
/// The only accepted shape is `<local-id>^^^&<health-id OID>&ISO`, where the
/// local id is non-empty and contains no `^`.
pub fn validate_patient_id(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    let suffix = format!("^^^&{HEALTH_ID_OID}&ISO");
    let local = trimmed
        .strip_suffix(suffix.as_str())
        .ok_or(ValidationError::PatientIdFormat(HEALTH_ID_OID))?;
    if local.is_empty() || local.contains('^') {
        return Err(ValidationError::PatientIdFormat(HEALTH_ID_OID));
    }
    Ok(trimmed.to_owned())
}

/// Validate that a source id is issued under the national organisation root.
pub fn validate_source_id(value: &str) -> Result<(), ValidationError> {
    if value.starts_with(NATIONAL_ORG_ROOT) {
        Ok(())
    } else {
        Err(ValidationError::SourceIdPrefix(NATIONAL_ORG_ROOT))
    }
}

/// Validate a creation time: ISO8601, or a bare 8–14 digit HL7 TS.
pub fn validate_creation_time(value: &str) -> Result<(), ValidationError> {
    if is_iso8601(value) {
        return Ok(());
    }
    let len = value.len();
    if (8..=14).contains(&len) && value.chars().all(|c| c.is_ascii_digit()) {
        return Ok(());
    }
    Err(ValidationError::CreationTimeFormat)
}
