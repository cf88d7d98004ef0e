//! ADT segment encoding.
//!
//! Produces one HL7 v2.5.1 message as a carriage-return-joined sequence of
//! segments in the fixed order `MSH, EVN, PID, [PD1], [PV1, PV2], [MRG],
//! [AL1]*, [DG1]*, [PR1]*, [NK1]*, [GT1]*, [IN1]*`. Field positions inside
//! each segment are absolute; empty placeholder fields are emitted to keep
//! the indices the standard mandates.

use std::sync::Arc;

use hie_types::{normalize_dob, to_hl7_timestamp, HEALTH_ID_OID, HL7_VERSION};
use uuid::Uuid;

use crate::decode::{decode_message, DecodedAdt};
use crate::escape::escape_field;
use crate::models::{AdditionalDemographics, AdtMessage, MessageHeader, PatientDemographics, Visit};
use crate::{ConformanceCheck, Hl7Error, Hl7Result, NoopConformance};

/// Codec facade for the ADT path.
///
/// Holds the conformance capability selected at process construction; all
/// encode/decode calls are otherwise pure over their inputs.
pub struct AdtCodec {
    conformance: Arc<dyn ConformanceCheck>,
}

impl AdtCodec {
    /// Codec with the no-op conformance capability.
    pub fn new() -> Self {
        Self::with_conformance(Arc::new(NoopConformance))
    }

    /// Codec with an injected conformance capability.
    pub fn with_conformance(conformance: Arc<dyn ConformanceCheck>) -> Self {
        Self { conformance }
    }

    /// Encode an ADT message to HL7 text.
    ///
    /// # Errors
    ///
    /// Returns [`Hl7Error::IdentifierAuthority`] if the primary patient
    /// identifier is not issued by the national health-id authority. A
    /// failing conformance check is logged as a warning and never blocks
    /// the result.
    pub fn encode(&self, message: &AdtMessage) -> Hl7Result<String> {
        let mut segments = vec![build_msh(&message.header)];

        let event_code = message
            .header
            .event
            .rsplit_once('^')
            .map(|(_, code)| code)
            .unwrap_or(&message.header.event);
        let event_time = to_hl7_timestamp(message.header.message_datetime.as_deref());
        segments.push(format!("EVN|{event_code}|{event_time}"));

        segments.push(build_pid(&message.patient)?);

        if let Some(pd1) = &message.pd1 {
            segments.push(build_pd1(pd1));
        }
        if let Some(visit) = &message.visit {
            segments.push(build_pv1(visit));
            segments.push(build_pv2(visit));
        }
        if let Some(mrg) = &message.mrg {
            segments.push(format!(
                "MRG|{}|||{}",
                opt(&mrg.prior_patient_id),
                opt(&mrg.prior_visit_number)
            ));
        }
        for a in message.al1.iter().flatten() {
            segments.push(format!(
                "AL1|||{}|{}|{}",
                esc(&a.allergen),
                esc(&a.reaction),
                esc(&a.severity)
            ));
        }
        for d in message.dg1.iter().flatten() {
            segments.push(format!(
                "DG1|{}|{}|{}|{}",
                d.set_id.as_deref().unwrap_or("1"),
                opt(&d.diagnosis_type),
                opt(&d.diagnosis_code),
                esc(&d.diagnosis_desc)
            ));
        }
        for p in message.pr1.iter().flatten() {
            segments.push(format!(
                "PR1|{}|{}|{}",
                p.set_id.as_deref().unwrap_or("1"),
                opt(&p.procedure_code),
                esc(&p.procedure_desc)
            ));
        }
        for nk in message.nk1.iter().flatten() {
            segments.push(format!(
                "NK1||{}|{}|{}",
                esc(&nk.name),
                esc(&nk.relationship),
                esc(&nk.phone_number)
            ));
        }
        for gt in message.gt1.iter().flatten() {
            segments.push(format!(
                "GT1|{}|{}|{}|{}",
                esc(&gt.guarantor_number),
                esc(&gt.guarantor_name),
                esc(&gt.guarantor_address),
                esc(&gt.guarantor_phone)
            ));
        }
        for ins in message.in1.iter().flatten() {
            segments.push(format!(
                "IN1|{}|{}|{}|{}|{}",
                esc(&ins.insurance_plan_id),
                esc(&ins.insurance_company_id),
                esc(&ins.insurance_company_name),
                esc(&ins.insured_id),
                esc(&ins.insured_name)
            ));
        }

        let message_text = segments.join("\r");
        if let Err(issues) = self.conformance.check(&message_text) {
            tracing::warn!("conformance check reported issues: {issues}");
        }
        Ok(message_text)
    }

    /// Decode HL7 text into the partial, position-indexed JSON model.
    pub fn decode(&self, text: &str) -> DecodedAdt {
        decode_message(text)
    }
}

impl Default for AdtCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn esc(value: &Option<String>) -> String {
    escape_field(opt(value))
}

fn ts_or_empty(value: &Option<String>) -> String {
    match value.as_deref() {
        Some(s) if !s.is_empty() => to_hl7_timestamp(Some(s)),
        _ => String::new(),
    }
}

fn build_msh(header: &MessageHeader) -> String {
    let encoding = r"^~\&";
    let timestamp = to_hl7_timestamp(header.message_datetime.as_deref());
    let control_id = match header.message_control_id.as_deref() {
        Some(id) if !id.is_empty() => id.to_owned(),
        _ => Uuid::new_v4().to_string(),
    };
    let version = match header.version.as_deref() {
        Some(v) if !v.is_empty() => v,
        _ => HL7_VERSION,
    };
    format!(
        "MSH|{encoding}|{}|{}|{}|{}|{timestamp}||{}|{control_id}|P|{version}",
        opt(&header.sending_app_oid),
        opt(&header.sending_facility),
        opt(&header.receiving_app),
        opt(&header.receiving_facility),
        header.event,
    )
}

fn build_pid(patient: &PatientDemographics) -> Hl7Result<String> {
    let mut pid3 = String::new();
    if let Some(first) = patient.identifiers.first() {
        // The primary identifier must be a national health id; this is the
        // one input invariant the encoder cannot delegate to the boundary.
        if first.assigning_authority.as_deref() != Some(HEALTH_ID_OID) {
            return Err(Hl7Error::IdentifierAuthority(HEALTH_ID_OID));
        }
        pid3 = format!("{}^^^{HEALTH_ID_OID}^ISO", first.id);
    }

    let has_name_part = [
        &patient.name_family,
        &patient.name_given,
        &patient.middle_name,
    ]
    .iter()
    .any(|p| !opt(p).is_empty());
    let name = if has_name_part {
        format!(
            "{}^{}^{}",
            esc(&patient.name_family),
            esc(&patient.name_given),
            esc(&patient.middle_name)
        )
    } else {
        String::new()
    };

    let dob = normalize_dob(opt(&patient.dob));
    Ok(format!("PID|1||{pid3}||{name}||{dob}|{}", opt(&patient.sex)))
}

fn build_pd1(pd1: &AdditionalDemographics) -> String {
    let prior = pd1
        .prior_patient_ids
        .iter()
        .flatten()
        .map(|p| {
            format!(
                "{}^^^{}^ISO",
                p.id,
                p.assigning_authority.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("~");
    format!("PD1|{}|{}", opt(&pd1.vip_indicator), prior)
}

fn build_pv1(visit: &Visit) -> String {
    let attending = format!(
        "{}^{}^{}",
        opt(&visit.attending_doctor_id),
        opt(&visit.attending_doctor_family),
        opt(&visit.attending_doctor_given)
    );
    format!(
        "PV1|1|{}|{}||||{attending}|||||||||||||||{}|{}|{}",
        opt(&visit.patient_class),
        opt(&visit.location),
        opt(&visit.visit_number),
        ts_or_empty(&visit.admit_datetime),
        ts_or_empty(&visit.discharge_datetime),
    )
}

fn build_pv2(visit: &Visit) -> String {
    format!(
        "PV2|||{}|{}",
        ts_or_empty(&visit.admit_datetime),
        ts_or_empty(&visit.discharge_datetime)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use hie_types::Identifier;

    fn patient(id: &str, authority: &str) -> PatientDemographics {
        PatientDemographics {
            identifiers: vec![Identifier {
                id: id.to_owned(),
                assigning_authority: Some(authority.to_owned()),
                id_type: None,
            }],
            name_family: Some("Doe".to_owned()),
            name_given: Some("John".to_owned()),
            middle_name: None,
            dob: Some("19800101".to_owned()),
            sex: Some("M".to_owned()),
        }
    }

    fn admission(event: &str) -> AdtMessage {
        AdtMessage {
            header: MessageHeader {
                event: event.to_owned(),
                sending_app_oid: Some("2.16.840.1.113883.3.3731.example.ehr".to_owned()),
                sending_facility: Some("HospitalA".to_owned()),
                receiving_app: None,
                receiving_facility: None,
                message_datetime: Some("2025-10-21T12:30:00Z".to_owned()),
                message_control_id: Some("MSG0001".to_owned()),
                version: Some(HL7_VERSION.to_owned()),
            },
            patient: patient("NHIC123456", HEALTH_ID_OID),
            pd1: None,
            visit: None,
            mrg: None,
            al1: None,
            dg1: None,
            pr1: None,
            nk1: None,
            gt1: None,
            in1: None,
        }
    }

    #[test]
    fn encodes_admission_header_and_patient() {
        let hl7 = AdtCodec::new().encode(&admission("ADT^A01")).expect("encode");
        let segments: Vec<&str> = hl7.split('\r').collect();
        assert_eq!(
            segments[0],
            "MSH|^~\\&|2.16.840.1.113883.3.3731.example.ehr|HospitalA|||20251021123000||ADT^A01|MSG0001|P|2.5.1"
        );
        assert_eq!(segments[1], "EVN|A01|20251021123000");
        assert!(segments[2]
            .starts_with(&format!("PID|1||NHIC123456^^^{HEALTH_ID_OID}^ISO||Doe^John")));
    }

    #[test]
    fn event_without_trigger_is_used_verbatim() {
        let hl7 = AdtCodec::new().encode(&admission("A31")).expect("encode");
        assert!(hl7.contains("\rEVN|A31|"));
    }

    #[test]
    fn rejects_foreign_primary_identifier() {
        let mut message = admission("ADT^A01");
        message.patient = patient("MRN9", "1.2.3.4");
        let err = AdtCodec::new().encode(&message).expect_err("must fail");
        assert!(matches!(err, Hl7Error::IdentifierAuthority(_)));
    }

    #[test]
    fn empty_identifier_list_leaves_pid3_blank() {
        let mut message = admission("ADT^A01");
        message.patient.identifiers.clear();
        let hl7 = AdtCodec::new().encode(&message).expect("encode");
        assert!(hl7.contains("\rPID|1||||Doe^John"));
    }

    #[test]
    fn visit_emits_pv1_and_pv2_with_fixed_placeholders() {
        let mut message = admission("ADT^A01");
        message.visit = Some(Visit {
            patient_class: Some("I".to_owned()),
            location: Some("Ward^01^01".to_owned()),
            admitting_doctor_id: None,
            admitting_doctor_family: None,
            admitting_doctor_given: None,
            attending_doctor_id: Some("123".to_owned()),
            attending_doctor_family: Some("Ali".to_owned()),
            attending_doctor_given: Some("Ahmed".to_owned()),
            visit_number: Some("V1".to_owned()),
            admit_datetime: Some("2025-10-21T10:00:00Z".to_owned()),
            discharge_datetime: None,
        });
        let hl7 = AdtCodec::new().encode(&message).expect("encode");
        assert!(hl7.contains(
            "\rPV1|1|I|Ward^01^01||||123^Ali^Ahmed|||||||||||||||V1|20251021100000|"
        ));
        assert!(hl7.contains("\rPV2|||20251021100000|"));
    }

    #[test]
    fn repeating_sections_emit_one_segment_each() {
        let mut message = admission("ADT^A01");
        message.al1 = Some(vec![
            crate::models::Allergy {
                allergen: Some("Penicillin".to_owned()),
                reaction: Some("Rash".to_owned()),
                severity: Some("SV".to_owned()),
            },
            crate::models::Allergy {
                allergen: Some("Latex".to_owned()),
                reaction: None,
                severity: None,
            },
        ]);
        message.dg1 = Some(vec![crate::models::Diagnosis {
            set_id: None,
            diagnosis_type: Some("F".to_owned()),
            diagnosis_code: Some("I10".to_owned()),
            diagnosis_desc: Some("Hypertension".to_owned()),
        }]);
        let hl7 = AdtCodec::new().encode(&message).expect("encode");
        assert!(hl7.contains("\rAL1|||Penicillin|Rash|SV"));
        assert!(hl7.contains("\rAL1|||Latex||"));
        assert!(hl7.contains("\rDG1|1|F|I10|Hypertension"));
    }

    #[test]
    fn missing_control_id_gets_generated_token() {
        let mut message = admission("ADT^A01");
        message.header.message_control_id = None;
        let hl7 = AdtCodec::new().encode(&message).expect("encode");
        let msh = hl7.split('\r').next().expect("msh");
        let control = msh.split('|').nth(9).expect("control id");
        assert!(!control.is_empty());
    }

    #[test]
    fn failing_conformance_check_is_advisory() {
        struct RejectAll;
        impl ConformanceCheck for RejectAll {
            fn check(&self, _message: &str) -> Result<(), String> {
                Err("unsupported message structure".to_owned())
            }
        }
        let codec = AdtCodec::with_conformance(Arc::new(RejectAll));
        let hl7 = codec.encode(&admission("ADT^A01")).expect("encode");
        assert!(hl7.starts_with("MSH|"));
    }

    #[test]
    fn reserved_characters_in_free_text_are_escaped() {
        let mut message = admission("ADT^A01");
        message.patient.name_family = Some("Smith|Jones".to_owned());
        let hl7 = AdtCodec::new().encode(&message).expect("encode");
        assert!(hl7.contains("Smith\\F\\Jones^John"));
    }
}
