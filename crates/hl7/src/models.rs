//! JSON intermediate-representation models for the HL7 encode path.
//!
//! These are the wire structs the service deserialises request bodies into.
//! Structural validation (required fields, identifier/timestamp shapes)
//! happens at this boundary; the encoder re-checks only what it cannot
//! delegate, namely the primary identifier's assigning authority.

use hie_types::{Identifier, HL7_VERSION};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Full input for one ADT message: header, patient, and optional sections.
///
/// Section keys mirror the segment each one maps to; repeating sections
/// (`al1`, `dg1`, `pr1`, `nk1`, `gt1`, `in1`) produce one segment per entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdtMessage {
    pub header: MessageHeader,
    pub patient: PatientDemographics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pd1: Option<AdditionalDemographics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit: Option<Visit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mrg: Option<MergeRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub al1: Option<Vec<Allergy>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dg1: Option<Vec<Diagnosis>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr1: Option<Vec<Procedure>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nk1: Option<Vec<NextOfKin>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt1: Option<Vec<Guarantor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in1: Option<Vec<InsuranceCoverage>>,
}

/// MSH/EVN source data.
///
/// `event` is the verbatim message type (`ADT^A01`, or a bare trigger); the
/// EVN event code is derived from it at encode time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MessageHeader {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sending_app_oid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sending_facility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiving_app: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiving_facility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_datetime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_control_id: Option<String>,
    /// MSH-12 version id; freshly generated messages default to 2.5.1.
    #[serde(default = "default_version")]
    pub version: Option<String>,
}

fn default_version() -> Option<String> {
    Some(HL7_VERSION.to_owned())
}

/// PID source data: ordered identifiers, name parts, dob and sex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientDemographics {
    pub identifiers: Vec<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_given: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
}

/// PD1 source data: VIP indicator and prior patient identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdditionalDemographics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vip_indicator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_patient_ids: Option<Vec<Identifier>>,
}

/// PV1/PV2 source data for the encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Visit {
    /// HL7 patient class; inpatient when not stated.
    #[serde(default = "default_patient_class")]
    pub patient_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admitting_doctor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admitting_doctor_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admitting_doctor_given: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attending_doctor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attending_doctor_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attending_doctor_given: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admit_datetime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discharge_datetime: Option<String>,
}

fn default_patient_class() -> Option<String> {
    Some("I".to_owned())
}

/// MRG source data for patient/visit merges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MergeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_patient_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_visit_number: Option<String>,
}

/// One AL1 entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Allergy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

/// One DG1 entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Diagnosis {
    /// DG1-1 set id; numbered `1` when not stated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis_desc: Option<String>,
}

/// One PR1 entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Procedure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure_desc: Option<String>,
}

/// One NK1 entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NextOfKin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// One GT1 entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Guarantor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guarantor_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guarantor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guarantor_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guarantor_phone: Option<String>,
}

/// One IN1 entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InsuranceCoverage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_plan_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_company_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insured_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insured_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_message_fills_defaults() {
        let msg: AdtMessage = serde_json::from_str(
            r#"{
                "header": {"event": "ADT^A01"},
                "patient": {"identifiers": [{"id": "NHIC123456"}]}
            }"#,
        )
        .expect("parse");
        assert_eq!(msg.header.version.as_deref(), Some("2.5.1"));
        assert_eq!(msg.patient.identifiers.len(), 1);
        assert!(msg.visit.is_none());
    }

    #[test]
    fn visit_defaults_to_inpatient_class() {
        let visit: Visit = serde_json::from_str(r#"{"location": "Ward^01^01"}"#).expect("parse");
        assert_eq!(visit.patient_class.as_deref(), Some("I"));
    }
}
