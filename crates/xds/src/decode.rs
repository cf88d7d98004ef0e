//! Namespace-agnostic decode of ebXML documents.
//!
//! Registries and gateways prefix these documents inconsistently (`rim:`,
//! `ns2:`, default namespace, none at all), so the decoder matches every
//! element and attribute by local name only. It walks the stream once,
//! extracting from the *first* ExtrinsicObject and the *first*
//! RegistryPackage it meets; everything else in the tree is ignored.

use std::collections::BTreeMap;

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::{XdsError, XdsResult};

/// Flat JSON summary of one ebXML document.
///
/// Slot names are carried verbatim (`creationTime`, `hash`, `size`, …) and
/// merged beside the fixed keys, matching the flat shape of the JSON
/// intermediate representation.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(rename = "objectType", skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(
        rename = "externalIdentifiers",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub external_identifiers: Vec<String>,
    #[serde(flatten)]
    pub slots: BTreeMap<String, String>,
    #[serde(rename = "submissionTime", skip_serializing_if = "Option::is_none")]
    pub submission_time: Option<String>,
}

/// Which first-level registry object the cursor is inside.
enum Section {
    Extrinsic,
    Package,
}

/// An ExternalIdentifier or Slot being captured; the first Value text
/// beneath it wins.
struct Capture {
    kind: CaptureKind,
    depth: usize,
    value: Option<String>,
}

enum CaptureKind {
    ExternalIdentifier,
    Slot(String),
}

/// Decode arbitrary ebXML text into a [`DocumentSummary`].
///
/// # Errors
///
/// Returns [`XdsError::InvalidXml`] when the input is not well-formed XML;
/// there is no partial result on malformed input.
pub fn decode_document(xml: &str) -> XdsResult<DocumentSummary> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out = DocumentSummary::default();
    let mut extrinsic_seen = false;
    let mut package_seen = false;
    let mut section: Option<Section> = None;
    let mut section_depth = 0usize;
    let mut capture: Option<Capture> = None;
    let mut in_value = false;

    // quick-xml tolerates truncated input; track element balance so a
    // document cut off mid-tree still fails instead of yielding a partial
    // summary.
    let mut open_elements = 0usize;
    let mut root_seen = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| XdsError::InvalidXml(e.to_string()))?;
        match event {
            Event::Start(e) => {
                open_elements += 1;
                root_seen = true;
                let local = local_name(&e);
                match section {
                    None => match local.as_str() {
                        "ExtrinsicObject" if !extrinsic_seen => {
                            extrinsic_seen = true;
                            read_extrinsic_attributes(&e, &mut out)?;
                            section = Some(Section::Extrinsic);
                            section_depth = 0;
                        }
                        "RegistryPackage" if !package_seen => {
                            package_seen = true;
                            section = Some(Section::Package);
                            section_depth = 0;
                        }
                        _ => {}
                    },
                    Some(ref current) => {
                        section_depth += 1;
                        match capture {
                            None => match (current, local.as_str()) {
                                (Section::Extrinsic, "ExternalIdentifier") => {
                                    capture = Some(Capture {
                                        kind: CaptureKind::ExternalIdentifier,
                                        depth: section_depth,
                                        value: None,
                                    });
                                }
                                (_, "Slot") => {
                                    if let Some(name) = attribute_value(&e, "name")? {
                                        capture = Some(Capture {
                                            kind: CaptureKind::Slot(name),
                                            depth: section_depth,
                                            value: None,
                                        });
                                    }
                                }
                                _ => {}
                            },
                            Some(ref c) => {
                                if local == "Value" && c.value.is_none() {
                                    in_value = true;
                                }
                            }
                        }
                    }
                }
            }
            Event::Empty(e) => {
                root_seen = true;
                // Self-closing registry objects carry attributes but no
                // slots or identifiers worth walking into.
                if section.is_none() {
                    let local = local_name(&e);
                    if local == "ExtrinsicObject" && !extrinsic_seen {
                        extrinsic_seen = true;
                        read_extrinsic_attributes(&e, &mut out)?;
                    } else if local == "RegistryPackage" {
                        package_seen = true;
                    }
                }
            }
            Event::Text(t) => {
                if in_value {
                    let text = t
                        .unescape()
                        .map_err(|e| XdsError::InvalidXml(e.to_string()))?;
                    if !text.is_empty() {
                        if let Some(c) = capture.as_mut() {
                            if c.value.is_none() {
                                c.value = Some(text.into_owned());
                            }
                        }
                    }
                }
            }
            Event::CData(t) => {
                if in_value {
                    let text = String::from_utf8_lossy(t.as_ref());
                    if !text.is_empty() {
                        if let Some(c) = capture.as_mut() {
                            if c.value.is_none() {
                                c.value = Some(text.into_owned());
                            }
                        }
                    }
                }
            }
            Event::End(_) => {
                in_value = false;
                open_elements = open_elements.saturating_sub(1);
                if let Some(active) = section.as_ref() {
                    if capture.as_ref().is_some_and(|c| c.depth == section_depth) {
                        if let Some(finished) = capture.take() {
                            apply_capture(&mut out, active, finished);
                        }
                    }
                    if section_depth == 0 {
                        section = None;
                    } else {
                        section_depth -= 1;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if open_elements > 0 || !root_seen {
        return Err(XdsError::InvalidXml(
            "unexpected end of document".to_owned(),
        ));
    }

    Ok(out)
}

fn apply_capture(out: &mut DocumentSummary, section: &Section, capture: Capture) {
    match (section, capture.kind) {
        (Section::Extrinsic, CaptureKind::ExternalIdentifier) => {
            if let Some(value) = capture.value {
                out.external_identifiers.push(value);
            }
        }
        (Section::Extrinsic, CaptureKind::Slot(name)) => {
            if let Some(value) = capture.value {
                out.slots.insert(name, value);
            }
        }
        (Section::Package, CaptureKind::Slot(name)) => {
            if name == "submissionTime" {
                if let Some(value) = capture.value {
                    out.submission_time = Some(value);
                }
            }
        }
        (Section::Package, CaptureKind::ExternalIdentifier) => {}
    }
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

fn read_extrinsic_attributes(
    element: &BytesStart<'_>,
    out: &mut DocumentSummary,
) -> XdsResult<()> {
    out.document_id = attribute_value(element, "id")?;
    out.mime_type = attribute_value(element, "mimeType")?;
    out.object_type = attribute_value(element, "objectType")?;
    Ok(())
}

/// Attribute lookup by local name, namespace prefix ignored.
fn attribute_value(element: &BytesStart<'_>, name: &str) -> XdsResult<Option<String>> {
    for attr in element.attributes() {
        let attr: Attribute<'_> = attr.map_err(|e| XdsError::InvalidXml(e.to_string()))?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|e| XdsError::InvalidXml(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL: &str = concat!(
        r#"<?xml version="1.0" encoding="utf-8"?>"#,
        r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:rim="urn:oasis:names:tc:ebxml-regrep:xsd:rim:3.0">"#,
        r#"<s:Body><rol:RegistryObjectList xmlns:rol="urn:oasis:names:tc:ebxml-regrep:xsd:rim:3.0">"#,
        r#"<rim:RegistryPackage id="rs.urn:uuid:doc-1">"#,
        r#"<rim:Slot name="submissionTime"><rim:ValueList><rim:Value>20251021123000</rim:Value></rim:ValueList></rim:Slot>"#,
        r#"</rim:RegistryPackage>"#,
        r#"<rim:ExtrinsicObject id="urn:uuid:doc-1" objectType="urn:uuid:34268e47-fdf5-41a6-ba33-82133c465248" mimeType="text/xml">"#,
        r#"<rim:ExternalIdentifier id="urn:uuid:e1" registryObject="urn:uuid:doc-1" identificationScheme="urn:uuid:58a6f841-87b3-4a3e-92fd-a8ffeff98427">"#,
        r#"<rim:Value>urn:uuid:doc-1</rim:Value></rim:ExternalIdentifier>"#,
        r#"<rim:ExternalIdentifier id="urn:uuid:e2" registryObject="urn:uuid:doc-1" identificationScheme="urn:uuid:58a6f841-87b3-4a3e-92fd-a8ffeff98427">"#,
        r#"<rim:Value>NHIC123456^^^&amp;2.16.840.1.113883.3.3731.1.1.100.1&amp;ISO</rim:Value></rim:ExternalIdentifier>"#,
        r#"<rim:Slot name="creationTime"><rim:ValueList><rim:Value>20251021123000</rim:Value></rim:ValueList></rim:Slot>"#,
        r#"<rim:Slot name="hash"><rim:ValueList><rim:Value>abc123</rim:Value></rim:ValueList></rim:Slot>"#,
        r#"</rim:ExtrinsicObject>"#,
        r#"</rol:RegistryObjectList></s:Body></s:Envelope>"#,
    );

    #[test]
    fn extracts_attributes_identifiers_and_slots() {
        let out = decode_document(CANONICAL).expect("decode");
        assert_eq!(out.document_id.as_deref(), Some("urn:uuid:doc-1"));
        assert_eq!(out.mime_type.as_deref(), Some("text/xml"));
        assert_eq!(
            out.object_type.as_deref(),
            Some("urn:uuid:34268e47-fdf5-41a6-ba33-82133c465248")
        );
        assert_eq!(
            out.external_identifiers,
            vec![
                "urn:uuid:doc-1".to_owned(),
                "NHIC123456^^^&2.16.840.1.113883.3.3731.1.1.100.1&ISO".to_owned(),
            ]
        );
        assert_eq!(out.slots.get("creationTime").map(String::as_str), Some("20251021123000"));
        assert_eq!(out.slots.get("hash").map(String::as_str), Some("abc123"));
        assert_eq!(out.submission_time.as_deref(), Some("20251021123000"));
    }

    #[test]
    fn prefixes_are_irrelevant() {
        // Same document with every rim: prefix (and its declaration)
        // relabelled to ns2:.
        let relabelled = CANONICAL.replace("rim:", "ns2:");
        assert_eq!(
            decode_document(CANONICAL).expect("decode"),
            decode_document(&relabelled).expect("decode"),
        );
    }

    #[test]
    fn unprefixed_elements_decode_identically() {
        let plain = concat!(
            "<Envelope><Body>",
            r#"<RegistryPackage id="rs.1">"#,
            r#"<Slot name="submissionTime"><ValueList><Value>20250101000000</Value></ValueList></Slot>"#,
            "</RegistryPackage>",
            r#"<ExtrinsicObject id="doc-9" mimeType="application/pdf">"#,
            r#"<ExternalIdentifier><Value>doc-9</Value></ExternalIdentifier>"#,
            r#"<Slot name="size"><ValueList><Value>42</Value></ValueList></Slot>"#,
            "</ExtrinsicObject>",
            "</Body></Envelope>",
        );
        let out = decode_document(plain).expect("decode");
        assert_eq!(out.document_id.as_deref(), Some("doc-9"));
        assert_eq!(out.mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(out.object_type, None);
        assert_eq!(out.external_identifiers, vec!["doc-9".to_owned()]);
        assert_eq!(out.slots.get("size").map(String::as_str), Some("42"));
        assert_eq!(out.submission_time.as_deref(), Some("20250101000000"));
    }

    #[test]
    fn only_the_first_extrinsic_object_is_read() {
        let xml = concat!(
            "<root>",
            r#"<ExtrinsicObject id="first"/>"#,
            r#"<ExtrinsicObject id="second"><Slot name="hash"><ValueList><Value>h2</Value></ValueList></Slot></ExtrinsicObject>"#,
            "</root>",
        );
        let out = decode_document(xml).expect("decode");
        assert_eq!(out.document_id.as_deref(), Some("first"));
        assert!(out.slots.is_empty());
    }

    #[test]
    fn malformed_xml_is_a_terminal_error() {
        let err = decode_document("<Envelope><Body>").expect_err("must fail");
        assert!(matches!(err, XdsError::InvalidXml(_)));
        let err = decode_document("not xml at all").expect_err("must fail");
        assert!(matches!(err, XdsError::InvalidXml(_)));
    }

    #[test]
    fn no_registry_objects_yield_an_empty_summary() {
        let out = decode_document("<Envelope><Body/></Envelope>").expect("decode");
        assert_eq!(out, DocumentSummary::default());
        let json = serde_json::to_value(&out).expect("serialise");
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn summary_serialises_flat() {
        let out = decode_document(CANONICAL).expect("decode");
        let json = serde_json::to_value(&out).expect("serialise");
        assert_eq!(json["document_id"], "urn:uuid:doc-1");
        assert_eq!(json["mimeType"], "text/xml");
        assert_eq!(json["hash"], "abc123");
        assert_eq!(json["submissionTime"], "20251021123000");
        assert!(json.get("slots").is_none());
    }
}
