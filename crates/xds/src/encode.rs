//! ITI-41 ebXML/SOAP envelope encoding.
//!
//! Builds the `ProvideAndRegisterDocumentSet-b` request: a SOAP envelope
//! whose body holds exactly one RegistryPackage (SubmissionSet), one
//! ExtrinsicObject (DocumentEntry) and the HasMember Association linking
//! them. Namespace prefixes come from the static table in
//! [`hie_types::ns::PREFIXES`] and are declared once on the envelope root.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hie_types::{hl7_now, scheme, validate_source_id, ns};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use sha1::{Digest, Sha1};
use uuid::Uuid;

use crate::decode::{decode_document, DocumentSummary};
use crate::models::SubmissionRequest;
use crate::{NoopSchemaValidator, SchemaValidate, XdsError, XdsResult};

/// Codec facade for the ITI-41 path.
///
/// Holds the schema-validation capability selected at process construction;
/// encode/decode calls are otherwise pure over their inputs apart from
/// generated ids and clock defaults.
pub struct XdsCodec {
    validator: Arc<dyn SchemaValidate>,
}

impl XdsCodec {
    /// Codec with the no-op schema-validation capability.
    pub fn new() -> Self {
        Self::with_schema_validator(Arc::new(NoopSchemaValidator))
    }

    /// Codec with an injected schema-validation capability.
    pub fn with_schema_validator(validator: Arc<dyn SchemaValidate>) -> Self {
        Self { validator }
    }

    /// Encode a submission into the ebXML/SOAP envelope.
    ///
    /// # Errors
    ///
    /// Returns [`XdsError::InvalidInput`] if the source id is outside the
    /// national organisation root. The boundary validators normally catch
    /// this earlier; the encoder re-checks because it is the last point
    /// before the value reaches the wire. A failing schema validation is
    /// logged as a warning and never blocks the result.
    pub fn encode(&self, request: &SubmissionRequest) -> XdsResult<String> {
        if let Some(source_id) = non_empty(&request.source_id) {
            validate_source_id(source_id)?;
        }
        let xml = build_envelope(request)?;
        if let Err(issues) = self.validator.validate(&xml) {
            tracing::warn!("schema validation reported issues: {issues}");
        }
        Ok(xml)
    }

    /// Decode an ebXML document into the flat JSON summary.
    pub fn decode(&self, xml: &str) -> XdsResult<DocumentSummary> {
        decode_document(xml)
    }
}

impl Default for XdsCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Fresh URN-form unique token for ebXML object ids.
pub(crate) fn new_urn() -> String {
    format!("urn:uuid:{}", Uuid::new_v4())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Submission/creation time: the caller's value verbatim, else UTC now.
fn effective_time(request: &SubmissionRequest) -> String {
    match non_empty(&request.creation_time) {
        Some(t) => t.to_owned(),
        None => hl7_now(),
    }
}

fn build_envelope(request: &SubmissionRequest) -> XdsResult<String> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut envelope = BytesStart::new("s:Envelope");
    for (prefix, uri) in ns::PREFIXES {
        envelope.push_attribute((format!("xmlns:{prefix}").as_str(), uri));
    }
    writer.write_event(Event::Start(envelope))?;

    writer.write_event(Event::Start(BytesStart::new("s:Header")))?;
    let action = request
        .soap
        .action
        .as_deref()
        .unwrap_or(scheme::DEFAULT_ACTION);
    write_text_element(&mut writer, "a:Action", action)?;
    let message_id = request
        .soap
        .message_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    write_text_element(&mut writer, "a:MessageID", &message_id)?;
    let to = request
        .soap
        .to
        .as_deref()
        .or(request.repository_address.as_deref())
        .unwrap_or("");
    write_text_element(&mut writer, "a:To", to)?;
    writer.write_event(Event::End(BytesEnd::new("s:Header")))?;

    writer.write_event(Event::Start(BytesStart::new("s:Body")))?;
    writer.write_event(Event::Start(BytesStart::new(
        "xds:ProvideAndRegisterDocumentSetRequest",
    )))?;
    writer.write_event(Event::Start(BytesStart::new("lcm:SubmitObjectsRequest")))?;
    writer.write_event(Event::Start(BytesStart::new("rim:RegistryObjectList")))?;

    let submission_id = request.unique_id.clone().unwrap_or_else(new_urn);
    let package_id = format!("rs.{submission_id}");
    write_submission_set(&mut writer, request, &submission_id, &package_id)?;

    let document_id = request.unique_id.clone().unwrap_or_else(new_urn);
    let doc_bytes = request.document_bytes();
    write_document_entry(&mut writer, request, &document_id, doc_bytes.as_deref())?;

    write_association(&mut writer, &package_id, &document_id)?;

    writer.write_event(Event::End(BytesEnd::new("rim:RegistryObjectList")))?;
    writer.write_event(Event::End(BytesEnd::new("lcm:SubmitObjectsRequest")))?;

    // Inline delivery: the document rides in the body as base64. The MTOM
    // path rewrites this element into an xop:Include reference afterwards.
    if let Some(bytes) = doc_bytes.as_deref() {
        let mut document = BytesStart::new("Document");
        document.push_attribute(("id", document_id.as_str()));
        document.push_attribute(("mimeType", request.effective_mime_type()));
        writer.write_event(Event::Start(document))?;
        let encoded = BASE64.encode(bytes);
        writer.write_event(Event::Text(BytesText::new(&encoded)))?;
        writer.write_event(Event::End(BytesEnd::new("Document")))?;
    }

    writer.write_event(Event::End(BytesEnd::new(
        "xds:ProvideAndRegisterDocumentSetRequest",
    )))?;
    writer.write_event(Event::End(BytesEnd::new("s:Body")))?;
    writer.write_event(Event::End(BytesEnd::new("s:Envelope")))?;

    String::from_utf8(writer.into_inner()).map_err(|e| XdsError::Encode(e.to_string()))
}

fn write_submission_set(
    writer: &mut Writer<Vec<u8>>,
    request: &SubmissionRequest,
    submission_id: &str,
    package_id: &str,
) -> XdsResult<()> {
    let mut package = BytesStart::new("rim:RegistryPackage");
    package.push_attribute(("id", package_id));
    writer.write_event(Event::Start(package))?;

    write_localized(writer, "rim:Name", "SubmissionSet")?;
    write_external_identifier(
        writer,
        package_id,
        scheme::SUBMISSION_SET_UNIQUE_ID,
        submission_id,
    )?;

    let submission_time = effective_time(request);
    write_slot(writer, "submissionTime", &submission_time)?;
    if let Some(source_id) = non_empty(&request.source_id) {
        write_slot(writer, "sourceId", source_id)?;
    }
    if let Some(repository_id) = non_empty(&request.repository_unique_id) {
        write_slot(writer, "repositoryUniqueID", repository_id)?;
    }

    writer.write_event(Event::End(BytesEnd::new("rim:RegistryPackage")))?;
    Ok(())
}

fn write_document_entry(
    writer: &mut Writer<Vec<u8>>,
    request: &SubmissionRequest,
    document_id: &str,
    doc_bytes: Option<&[u8]>,
) -> XdsResult<()> {
    let object_type = non_empty(&request.object_type).unwrap_or(scheme::OBJECT_TYPE_ON_DEMAND);
    let mut entry = BytesStart::new("rim:ExtrinsicObject");
    entry.push_attribute(("id", document_id));
    entry.push_attribute(("objectType", object_type));
    entry.push_attribute(("mimeType", request.effective_mime_type()));
    writer.write_event(Event::Start(entry))?;

    write_localized(writer, "rim:Name", "Clinical Document")?;
    write_localized(writer, "rim:Description", "Document (CDA or other)")?;

    if let Some(class_code) = non_empty(&request.class_code) {
        write_classification(writer, scheme::CLASS_CODE, class_code)?;
    }
    if let Some(type_code) = non_empty(&request.type_code) {
        write_classification(writer, scheme::TYPE_CODE, type_code)?;
    }

    write_external_identifier(writer, document_id, scheme::DOCUMENT_UNIQUE_ID, document_id)?;
    write_external_identifier(
        writer,
        document_id,
        scheme::DOCUMENT_UNIQUE_ID,
        &request.patient_id,
    )?;
    if let Some(source_id) = non_empty(&request.source_id) {
        write_external_identifier(writer, document_id, scheme::DOCUMENT_UNIQUE_ID, source_id)?;
    }

    let creation_time = effective_time(request);
    write_slot(writer, "creationTime", &creation_time)?;

    if let Some(bytes) = doc_bytes {
        let digest = hex::encode(Sha1::digest(bytes));
        write_slot(writer, "hash", &digest)?;
        write_slot(writer, "size", &bytes.len().to_string())?;
        let format_code = if request.effective_mime_type().to_lowercase().contains("pdf") {
            scheme::FORMAT_PDF
        } else {
            scheme::FORMAT_UNKNOWN
        };
        write_slot(writer, "formatCode", format_code)?;
    }

    if let Some(practice_setting) = non_empty(&request.practice_setting_code) {
        write_slot(writer, "practiceSettingCode", practice_setting)?;
    }
    if let Some(repository_id) = non_empty(&request.repository_unique_id) {
        write_slot(writer, "repositoryUniqueID", repository_id)?;
    }

    writer.write_event(Event::End(BytesEnd::new("rim:ExtrinsicObject")))?;
    Ok(())
}

fn write_association(
    writer: &mut Writer<Vec<u8>>,
    package_id: &str,
    document_id: &str,
) -> XdsResult<()> {
    let id = new_urn();
    let mut association = BytesStart::new("rim:Association");
    association.push_attribute(("id", id.as_str()));
    association.push_attribute(("associationType", scheme::ASSOCIATION_HAS_MEMBER));
    association.push_attribute(("sourceObject", package_id));
    association.push_attribute(("targetObject", document_id));
    association.push_attribute(("status", scheme::STATUS_APPROVED));
    writer.write_event(Event::Empty(association))?;
    Ok(())
}

fn write_classification(
    writer: &mut Writer<Vec<u8>>,
    classification_scheme: &str,
    node: &str,
) -> XdsResult<()> {
    let id = new_urn();
    let mut classification = BytesStart::new("rim:Classification");
    classification.push_attribute(("classificationScheme", classification_scheme));
    classification.push_attribute(("classificationNode", node));
    classification.push_attribute(("id", id.as_str()));
    writer.write_event(Event::Empty(classification))?;
    Ok(())
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> XdsResult<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// `<name><rim:LocalizedString value="…"/></name>`
fn write_localized(writer: &mut Writer<Vec<u8>>, name: &str, value: &str) -> XdsResult<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    let mut localized = BytesStart::new("rim:LocalizedString");
    localized.push_attribute(("value", value));
    writer.write_event(Event::Empty(localized))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_external_identifier(
    writer: &mut Writer<Vec<u8>>,
    registry_object: &str,
    identification_scheme: &str,
    value: &str,
) -> XdsResult<()> {
    let id = new_urn();
    let mut identifier = BytesStart::new("rim:ExternalIdentifier");
    identifier.push_attribute(("id", id.as_str()));
    identifier.push_attribute(("registryObject", registry_object));
    identifier.push_attribute(("identificationScheme", identification_scheme));
    writer.write_event(Event::Start(identifier))?;
    write_text_element(writer, "rim:Value", value)?;
    writer.write_event(Event::End(BytesEnd::new("rim:ExternalIdentifier")))?;
    Ok(())
}

fn write_slot(writer: &mut Writer<Vec<u8>>, name: &str, value: &str) -> XdsResult<()> {
    let mut slot = BytesStart::new("rim:Slot");
    slot.push_attribute(("name", name));
    writer.write_event(Event::Start(slot))?;
    writer.write_event(Event::Start(BytesStart::new("rim:ValueList")))?;
    write_text_element(writer, "rim:Value", value)?;
    writer.write_event(Event::End(BytesEnd::new("rim:ValueList")))?;
    writer.write_event(Event::End(BytesEnd::new("rim:Slot")))?;
    Ok(())
}
