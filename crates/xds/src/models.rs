//! JSON intermediate-representation models for the ITI-41 encode path.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hie_types::{validate_creation_time, validate_patient_id, validate_source_id};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::XdsResult;

/// WS-Addressing fields for the SOAP header.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SoapAddressing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

/// Full input for one ProvideAndRegisterDocumentSet-b submission.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SubmissionRequest {
    #[serde(default)]
    pub soap: SoapAddressing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_address: Option<String>,
    /// Patient id in XDS format: `<Id>^^^&<health-id OID>&ISO`.
    pub patient_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practice_setting_code: Option<String>,
    /// Shared unique id for the SubmissionSet and DocumentEntry; fresh
    /// `urn:uuid:` tokens are generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_base64: Option<String>,
    #[serde(default = "default_mime_type")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_unique_id: Option<String>,
}

fn default_mime_type() -> Option<String> {
    Some("text/xml".to_owned())
}

impl SubmissionRequest {
    /// Run the input-shape validators and canonicalise the patient id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::XdsError::InvalidInput`] when the patient id is not
    /// in XDS format, the source id is outside the national organisation
    /// root, or the creation time is neither ISO8601 nor an HL7 TS.
    pub fn validate(&mut self) -> XdsResult<()> {
        self.patient_id = validate_patient_id(&self.patient_id)?;
        if let Some(source_id) = self.source_id.as_deref().filter(|s| !s.is_empty()) {
            validate_source_id(source_id)?;
        }
        if let Some(creation_time) = self.creation_time.as_deref().filter(|s| !s.is_empty()) {
            validate_creation_time(creation_time)?;
        }
        Ok(())
    }

    /// Decode the document payload, if any.
    ///
    /// Malformed base64 degrades to treating the raw string as UTF-8 bytes
    /// rather than failing; an empty string counts as no document.
    pub fn document_bytes(&self) -> Option<Vec<u8>> {
        let raw = self.document_base64.as_deref().filter(|s| !s.is_empty())?;
        Some(match BASE64.decode(raw) {
            Ok(bytes) => bytes,
            Err(_) => raw.as_bytes().to_vec(),
        })
    }

    /// Effective mime type, defaulting to `text/xml`.
    pub fn effective_mime_type(&self) -> &str {
        match self.mime_type.as_deref() {
            Some(m) if !m.is_empty() => m,
            _ => "text/xml",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hie_types::{HEALTH_ID_OID, NATIONAL_ORG_ROOT};

    fn request() -> SubmissionRequest {
        SubmissionRequest {
            patient_id: format!("NHIC123456^^^&{HEALTH_ID_OID}&ISO"),
            ..SubmissionRequest::default()
        }
    }

    #[test]
    fn validates_canonical_request() {
        let mut req = request();
        req.source_id = Some(format!("{NATIONAL_ORG_ROOT}.12345"));
        req.creation_time = Some("2025-10-21T12:30:00Z".to_owned());
        req.validate().expect("valid");
    }

    #[test]
    fn rejects_malformed_patient_id() {
        let mut req = request();
        req.patient_id = "NHIC123456".to_owned();
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_foreign_source_id() {
        let mut req = request();
        req.source_id = Some("9.9.9.9.1".to_owned());
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_non_timestamp_creation_time() {
        let mut req = request();
        req.creation_time = Some("yesterday".to_owned());
        assert!(req.validate().is_err());
    }

    #[test]
    fn document_bytes_decodes_base64() {
        let mut req = request();
        req.document_base64 = Some("ZG9jdW1lbnRjb250ZW50".to_owned());
        assert_eq!(req.document_bytes().expect("bytes"), b"documentcontent");
    }

    #[test]
    fn malformed_base64_degrades_to_raw_bytes() {
        let mut req = request();
        req.document_base64 = Some("not base64 at all!".to_owned());
        assert_eq!(
            req.document_bytes().expect("bytes"),
            b"not base64 at all!".to_vec()
        );
    }

    #[test]
    fn empty_document_counts_as_absent() {
        let mut req = request();
        req.document_base64 = Some(String::new());
        assert!(req.document_bytes().is_none());
    }

    #[test]
    fn mime_type_defaults_when_deserialised() {
        let req: SubmissionRequest =
            serde_json::from_str(&format!(
                r#"{{"patient_id": "NHIC123456^^^&{HEALTH_ID_OID}&ISO"}}"#
            ))
            .expect("parse");
        assert_eq!(req.effective_mime_type(), "text/xml");
    }
}
