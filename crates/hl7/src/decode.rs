//! Position-indexed partial decode of HL7 text.
//!
//! The decoder splits the message on carriage return, each segment on `|`,
//! and dispatches on the segment name using a fixed per-segment field-index
//! table. It is not a general HL7 grammar parser: repetition, components and
//! escape sequences are left as raw substrings, out-of-range field access
//! yields an empty string, and fields outside the table are dropped. The
//! result is a partial model that is not invertible back to the encoder's
//! input.

use serde::Serialize;

/// Partial JSON model recovered from an HL7 message.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DecodedAdt {
    pub header: DecodedHeader,
    pub patient: DecodedPatient,
    pub pd1: Option<DecodedPd1>,
    pub visit: Option<DecodedVisit>,
    pub mrg: Option<DecodedMerge>,
    pub al1: Vec<DecodedAllergy>,
    pub dg1: Vec<DecodedDiagnosis>,
    pub pr1: Vec<DecodedProcedure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nk1: Option<Vec<DecodedNextOfKin>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt1: Option<Vec<DecodedGuarantor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in1: Option<Vec<DecodedInsurance>>,
}

/// MSH/EVN fields, populated only when the segments are present.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DecodedHeader {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sending_app_oid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sending_facility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiving_app: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiving_facility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_datetime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_control_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evn_datetime: Option<String>,
}

/// PID fields. The identifier is the raw PID-3 substring; authority and
/// type components are not separated out.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DecodedPatient {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
}

/// PD1 fields: VIP indicator plus the raw prior-identifier list.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DecodedPd1 {
    pub vip: String,
    pub prior_ids: String,
}

/// PV1/PV2 fields, merged into one visit record.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DecodedVisit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attending_doctor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discharge: Option<String>,
}

/// MRG fields.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DecodedMerge {
    pub prior_patient_id: String,
    pub prior_visit: String,
}

/// One decoded AL1 entry.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DecodedAllergy {
    pub allergen: String,
    pub reaction: String,
}

/// One decoded DG1 entry.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DecodedDiagnosis {
    pub code: String,
    pub desc: String,
}

/// One decoded PR1 entry.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DecodedProcedure {
    pub code: String,
    pub desc: String,
}

/// One decoded NK1 entry.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DecodedNextOfKin {
    pub name: String,
    pub relationship: String,
    pub phone_number: String,
}

/// One decoded GT1 entry.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DecodedGuarantor {
    pub guarantor_number: String,
    pub guarantor_name: String,
    pub guarantor_address: String,
    pub guarantor_phone: String,
}

/// One decoded IN1 entry.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DecodedInsurance {
    pub insurance_plan_id: String,
    pub insurance_company_id: String,
    pub insurance_company_name: String,
    pub insured_id: String,
    pub insured_name: String,
}

/// Typed partial record for one segment, keyed by segment name.
enum Segment {
    Msh(DecodedHeader),
    Evn { code: String, datetime: String },
    Pid(DecodedPatient),
    Pd1(DecodedPd1),
    Pv1(DecodedVisit),
    Pv2 { admit: String, discharge: String },
    Mrg(DecodedMerge),
    Al1(DecodedAllergy),
    Dg1(DecodedDiagnosis),
    Pr1(DecodedProcedure),
    Nk1(DecodedNextOfKin),
    Gt1(DecodedGuarantor),
    In1(DecodedInsurance),
}

/// Decode an HL7 message into the partial JSON model.
///
/// Never fails: unknown segments are skipped and missing fields come back
/// as empty strings.
pub fn decode_message(text: &str) -> DecodedAdt {
    let mut result = DecodedAdt::default();
    for raw in text.split('\r').filter(|s| !s.trim().is_empty()) {
        let fields: Vec<&str> = raw.split('|').collect();
        let Some(segment) = parse_segment(&fields) else {
            continue;
        };
        apply_segment(&mut result, segment);
    }
    result
}

/// Field accessor: 0 is the segment name, out-of-range yields `""`.
fn field<'a>(fields: &[&'a str], index: usize) -> &'a str {
    fields.get(index).copied().unwrap_or("")
}

fn parse_segment(fields: &[&str]) -> Option<Segment> {
    let owned = |index: usize| field(fields, index).to_owned();
    match field(fields, 0) {
        "MSH" => Some(Segment::Msh(DecodedHeader {
            sending_app_oid: Some(owned(2)),
            sending_facility: Some(owned(3)),
            receiving_app: Some(owned(4)),
            receiving_facility: Some(owned(5)),
            message_datetime: Some(owned(6)),
            event: Some(owned(8)),
            message_control_id: Some(owned(9)),
            version: Some(owned(11)),
            evn: None,
            evn_datetime: None,
        })),
        "EVN" => Some(Segment::Evn {
            code: owned(1),
            datetime: owned(2),
        }),
        "PID" => Some(Segment::Pid(DecodedPatient {
            identifiers: vec![owned(3)],
            name: Some(owned(5)),
            dob: Some(owned(7)),
            sex: Some(owned(8)),
        })),
        "PD1" => Some(Segment::Pd1(DecodedPd1 {
            vip: owned(1),
            prior_ids: owned(2),
        })),
        "PV1" => Some(Segment::Pv1(DecodedVisit {
            patient_class: Some(owned(2)),
            location: Some(owned(3)),
            attending_doctor: Some(owned(8)),
            visit_number: Some(owned(19)),
            admit: None,
            discharge: None,
        })),
        "PV2" => Some(Segment::Pv2 {
            admit: owned(3),
            discharge: owned(4),
        }),
        "MRG" => Some(Segment::Mrg(DecodedMerge {
            prior_patient_id: owned(1),
            prior_visit: owned(4),
        })),
        "AL1" => Some(Segment::Al1(DecodedAllergy {
            allergen: owned(3),
            reaction: owned(4),
        })),
        "DG1" => Some(Segment::Dg1(DecodedDiagnosis {
            code: owned(3),
            desc: owned(4),
        })),
        "PR1" => Some(Segment::Pr1(DecodedProcedure {
            code: owned(2),
            desc: owned(3),
        })),
        "NK1" => Some(Segment::Nk1(DecodedNextOfKin {
            name: owned(2),
            relationship: owned(3),
            phone_number: owned(4),
        })),
        "GT1" => Some(Segment::Gt1(DecodedGuarantor {
            guarantor_number: owned(1),
            guarantor_name: owned(2),
            guarantor_address: owned(3),
            guarantor_phone: owned(4),
        })),
        "IN1" => Some(Segment::In1(DecodedInsurance {
            insurance_plan_id: owned(1),
            insurance_company_id: owned(2),
            insurance_company_name: owned(3),
            insured_id: owned(4),
            insured_name: owned(5),
        })),
        _ => None,
    }
}

fn apply_segment(result: &mut DecodedAdt, segment: Segment) {
    match segment {
        Segment::Msh(header) => {
            let evn = result.header.evn.take();
            let evn_datetime = result.header.evn_datetime.take();
            result.header = DecodedHeader {
                evn,
                evn_datetime,
                ..header
            };
        }
        Segment::Evn { code, datetime } => {
            result.header.evn = Some(code);
            result.header.evn_datetime = Some(datetime);
        }
        Segment::Pid(patient) => result.patient = patient,
        Segment::Pd1(pd1) => result.pd1 = Some(pd1),
        Segment::Pv1(visit) => {
            let existing = result.visit.get_or_insert_with(DecodedVisit::default);
            existing.patient_class = visit.patient_class;
            existing.location = visit.location;
            existing.attending_doctor = visit.attending_doctor;
            existing.visit_number = visit.visit_number;
        }
        Segment::Pv2 { admit, discharge } => {
            let existing = result.visit.get_or_insert_with(DecodedVisit::default);
            existing.admit = Some(admit);
            existing.discharge = Some(discharge);
        }
        Segment::Mrg(mrg) => result.mrg = Some(mrg),
        Segment::Al1(entry) => result.al1.push(entry),
        Segment::Dg1(entry) => result.dg1.push(entry),
        Segment::Pr1(entry) => result.pr1.push(entry),
        Segment::Nk1(entry) => result.nk1.get_or_insert_with(Vec::new).push(entry),
        Segment::Gt1(entry) => result.gt1.get_or_insert_with(Vec::new).push(entry),
        Segment::In1(entry) => result.in1.get_or_insert_with(Vec::new).push(entry),
    }
}
