//! End-to-end conformance checks for the ITI-41 path: envelope shape,
//! hash/size slots, attachment transport switching, and decode fidelity.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hie_types::{HEALTH_ID_OID, NATIONAL_ORG_ROOT};
use hie_xds::{select_transport, SubmissionRequest, TransportArtifact, XdsCodec};
use sha1::{Digest, Sha1};

fn submission() -> SubmissionRequest {
    SubmissionRequest {
        patient_id: format!("NHIC123^^^&{HEALTH_ID_OID}&ISO"),
        unique_id: Some("urn:uuid:doc-1".to_owned()),
        creation_time: Some("20251021123000".to_owned()),
        source_id: Some(format!("{NATIONAL_ORG_ROOT}.source")),
        repository_unique_id: Some(format!("{NATIONAL_ORG_ROOT}.repo")),
        repository_address: Some("https://repo.example".to_owned()),
        ..SubmissionRequest::default()
    }
}

#[test]
fn mtom_switch_at_300k() {
    let mut request = submission();
    request.unique_id = Some("urn:uuid:doc-large".to_owned());
    request.document_base64 = Some(BASE64.encode(vec![b'A'; 300_000]));
    request.validate().expect("valid input");

    let codec = XdsCodec::new();
    let xml = codec.encode(&request).expect("encode");
    let artifact = select_transport(xml, &request);

    let TransportArtifact::Multipart(package) = artifact else {
        panic!("expected multipart for a 300k document");
    };
    assert!(package.content_type.contains("multipart/related"));
    let body = String::from_utf8_lossy(&package.body);
    assert!(body.contains("xop:Include"));
    assert!(!body.contains(&BASE64.encode(vec![b'A'; 300_000])));
}

#[test]
fn small_document_stays_inline() {
    let mut request = submission();
    request.document_base64 = Some(BASE64.encode(b"documentcontent"));
    request.validate().expect("valid input");

    let codec = XdsCodec::new();
    let xml = codec.encode(&request).expect("encode");
    let artifact = select_transport(xml.clone(), &request);
    assert_eq!(artifact, TransportArtifact::Inline(xml));
}

#[test]
fn hash_and_size_match_the_exact_input_bytes() {
    let content = b"documentcontent";
    let mut request = submission();
    request.document_base64 = Some(BASE64.encode(content));

    let xml = XdsCodec::new().encode(&request).expect("encode");
    let summary = XdsCodec::new().decode(&xml).expect("decode");

    let expected_hash = hex::encode(Sha1::digest(content));
    assert_eq!(summary.slots.get("hash"), Some(&expected_hash));
    assert_eq!(
        summary.slots.get("size"),
        Some(&content.len().to_string())
    );
}

#[test]
fn encode_then_decode_recovers_the_patient_id() {
    let request = submission();
    let xml = XdsCodec::new().encode(&request).expect("encode");
    let summary = XdsCodec::new().decode(&xml).expect("decode");

    assert_eq!(summary.document_id.as_deref(), Some("urn:uuid:doc-1"));
    assert!(summary
        .external_identifiers
        .contains(&format!("NHIC123^^^&{HEALTH_ID_OID}&ISO")));
    assert_eq!(
        summary.submission_time.as_deref(),
        Some("20251021123000")
    );
    assert_eq!(
        summary.slots.get("creationTime").map(String::as_str),
        Some("20251021123000")
    );
}

#[test]
fn no_document_submission_links_package_and_entry() {
    let request = submission();
    let xml = XdsCodec::new().encode(&request).expect("encode");

    assert_eq!(xml.matches("<rim:ExtrinsicObject").count(), 1);
    assert_eq!(xml.matches("<rim:RegistryPackage").count(), 1);
    assert_eq!(xml.matches("<rim:Association").count(), 1);
    assert!(xml.contains("urn:oasis:names:tc:ebxml-regrep:AssociationType:HasMember"));
    assert!(!xml.contains("<Document"));
}
