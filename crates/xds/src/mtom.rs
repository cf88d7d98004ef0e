//! Attachment transport selection: inline base64 vs MTOM/XOP multipart.
//!
//! Documents below 256 KiB stay inline in the envelope body. At or above
//! the threshold the `<Document>` element is rewritten to an `xop:Include`
//! reference and the raw bytes move into a `multipart/related` binary part
//! keyed by the same content-id. Only the construction contract lives here;
//! resolving a content-id back to stored bytes is a repository concern.

use hie_types::ns;
use uuid::Uuid;

use crate::models::SubmissionRequest;

/// Attachment size threshold: 256 KiB.
pub const MTOM_THRESHOLD_BYTES: usize = 262_144;

/// Document id used when a document is supplied without a `unique_id`.
pub const DEFAULT_DOCUMENT_ID: &str = "urn:uuid:doc-1";

/// The wire artifact the transport layer ships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportArtifact {
    /// Plain envelope, document (if any) inline as base64.
    Inline(String),
    /// MTOM/XOP multipart package.
    Multipart(MtomPackage),
}

impl TransportArtifact {
    /// Transport content type for this artifact.
    pub fn content_type(&self) -> &str {
        match self {
            TransportArtifact::Inline(_) => "application/xml",
            TransportArtifact::Multipart(package) => &package.content_type,
        }
    }

    /// Raw response body bytes.
    pub fn into_body(self) -> Vec<u8> {
        match self {
            TransportArtifact::Inline(xml) => xml.into_bytes(),
            TransportArtifact::Multipart(package) => package.body,
        }
    }
}

/// A built `multipart/related` payload and the header that describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MtomPackage {
    /// `multipart/related; type="application/xop+xml"; boundary="…"`.
    pub content_type: String,
    /// Full multipart body: root XML part plus one binary part.
    pub body: Vec<u8>,
    /// Generated MIME boundary.
    pub boundary: String,
    /// Content-id of the binary part, referenced from the root part.
    pub content_id: String,
}

/// Choose the transport for an encoded envelope.
///
/// Pure over its inputs apart from the generated boundary; the decision
/// depends only on the decoded document length.
pub fn select_transport(xml: String, request: &SubmissionRequest) -> TransportArtifact {
    let Some(bytes) = request.document_bytes() else {
        return TransportArtifact::Inline(xml);
    };
    if bytes.len() < MTOM_THRESHOLD_BYTES {
        return TransportArtifact::Inline(xml);
    }

    let document_id = request.unique_id.as_deref().unwrap_or(DEFAULT_DOCUMENT_ID);
    let mime_type = request.effective_mime_type();
    let rewritten = rewrite_document_as_xop(&xml, document_id, mime_type);
    TransportArtifact::Multipart(package_multipart(
        &rewritten,
        &bytes,
        mime_type,
        document_id,
    ))
}

/// Replace the inline `<Document>` content with an `xop:Include` reference.
///
/// Leaves the envelope untouched when no matching element is found.
pub fn rewrite_document_as_xop(xml: &str, document_id: &str, mime_type: &str) -> String {
    let open_marker = format!("<Document id=\"{document_id}\"");
    let Some(start) = xml.find(&open_marker) else {
        return xml.to_owned();
    };
    let Some(end_offset) = xml[start..].find("</Document>") else {
        return xml.to_owned();
    };
    let end = start + end_offset + "</Document>".len();

    let replacement = format!(
        "<Document id=\"{document_id}\" mimeType=\"{mime_type}\">\
         <xop:Include href=\"cid:{document_id}@example.com\" xmlns:xop=\"{}\"/>\
         </Document>",
        ns::XOP_INCLUDE
    );

    let mut out = String::with_capacity(xml.len());
    out.push_str(&xml[..start]);
    out.push_str(&replacement);
    out.push_str(&xml[end..]);
    out
}

/// Assemble the `multipart/related` payload: root XML part, then the binary
/// document part keyed by its content-id.
fn package_multipart(
    xml_envelope: &str,
    doc_bytes: &[u8],
    mime_type: &str,
    document_id: &str,
) -> MtomPackage {
    let boundary = format!("uuid:{}", Uuid::new_v4());
    let content_id = format!("{document_id}@example.com");

    let mut body = Vec::with_capacity(xml_envelope.len() + doc_bytes.len() + 512);
    push_line(&mut body, &format!("--{boundary}"));
    push_line(
        &mut body,
        "Content-Type: application/xop+xml; type=\"text/xml\"; charset=UTF-8",
    );
    push_line(&mut body, "Content-ID: <rootpart@example.com>");
    push_line(&mut body, "");
    body.extend_from_slice(xml_envelope.as_bytes());
    push_line(&mut body, "");
    push_line(&mut body, &format!("--{boundary}"));
    push_line(&mut body, &format!("Content-Type: {mime_type}"));
    push_line(&mut body, &format!("Content-ID: <{content_id}>"));
    push_line(&mut body, "");
    body.extend_from_slice(doc_bytes);
    push_line(&mut body, "");
    push_line(&mut body, &format!("--{boundary}--"));

    let content_type =
        format!("multipart/related; type=\"application/xop+xml\"; boundary=\"{boundary}\"");

    MtomPackage {
        content_type,
        body,
        boundary,
        content_id,
    }
}

fn push_line(body: &mut Vec<u8>, line: &str) {
    body.extend_from_slice(line.as_bytes());
    body.extend_from_slice(b"\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use hie_types::HEALTH_ID_OID;

    fn request_with_document(len: usize) -> SubmissionRequest {
        SubmissionRequest {
            patient_id: format!("NHIC123456^^^&{HEALTH_ID_OID}&ISO"),
            unique_id: Some("urn:uuid:doc-1".to_owned()),
            document_base64: Some(BASE64.encode(vec![b'A'; len])),
            ..SubmissionRequest::default()
        }
    }

    const ENVELOPE: &str =
        r#"<s:Envelope><Document id="urn:uuid:doc-1" mimeType="text/xml">QUFB</Document></s:Envelope>"#;

    #[test]
    fn document_below_threshold_stays_inline() {
        let artifact = select_transport(
            ENVELOPE.to_owned(),
            &request_with_document(MTOM_THRESHOLD_BYTES - 1),
        );
        assert_eq!(artifact, TransportArtifact::Inline(ENVELOPE.to_owned()));
        assert_eq!(artifact.content_type(), "application/xml");
    }

    #[test]
    fn document_at_threshold_switches_to_multipart() {
        let artifact = select_transport(
            ENVELOPE.to_owned(),
            &request_with_document(MTOM_THRESHOLD_BYTES),
        );
        let TransportArtifact::Multipart(package) = artifact else {
            panic!("expected multipart");
        };
        assert!(package
            .content_type
            .starts_with("multipart/related; type=\"application/xop+xml\"; boundary=\""));
        let body = String::from_utf8_lossy(&package.body);
        assert!(body.contains("xop:Include"));
        assert!(body.contains("cid:urn:uuid:doc-1@example.com"));
        assert!(body.contains("Content-ID: <urn:uuid:doc-1@example.com>"));
    }

    #[test]
    fn no_document_is_always_inline() {
        let mut request = request_with_document(0);
        request.document_base64 = None;
        let artifact = select_transport(ENVELOPE.to_owned(), &request);
        assert!(matches!(artifact, TransportArtifact::Inline(_)));
    }

    #[test]
    fn rewrite_replaces_inline_content_with_include() {
        let rewritten = rewrite_document_as_xop(ENVELOPE, "urn:uuid:doc-1", "text/xml");
        assert!(!rewritten.contains("QUFB"));
        assert!(rewritten.contains(
            "<xop:Include href=\"cid:urn:uuid:doc-1@example.com\" \
             xmlns:xop=\"http://www.w3.org/2004/08/xop/include\"/>"
        ));
    }

    #[test]
    fn rewrite_without_matching_element_is_a_no_op() {
        let rewritten = rewrite_document_as_xop(ENVELOPE, "urn:uuid:other", "text/xml");
        assert_eq!(rewritten, ENVELOPE);
    }

    #[test]
    fn multipart_body_carries_the_raw_bytes_once() {
        let request = request_with_document(MTOM_THRESHOLD_BYTES);
        let artifact = select_transport(ENVELOPE.to_owned(), &request);
        let TransportArtifact::Multipart(package) = artifact else {
            panic!("expected multipart");
        };
        let raw = vec![b'A'; MTOM_THRESHOLD_BYTES];
        let found = package
            .body
            .windows(raw.len())
            .filter(|w| *w == raw.as_slice())
            .count();
        assert_eq!(found, 1);
        assert!(package.body.ends_with(
            format!("--{}--\r\n", package.boundary).as_bytes()
        ));
    }
}
