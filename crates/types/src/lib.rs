//! Shared wire constants and value types for the HIE mapper.
//!
//! Both boundary crates (`hie-hl7`, `hie-xds`) translate against the same
//! national exchange profile: one health-id assigning authority, one
//! organisation root OID, and a fixed set of ebXML scheme URNs and XML
//! namespaces. This crate is the single home for those constants, plus the
//! identifier/timestamp handling every codec path shares.

pub mod time;
pub mod validate;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use time::{hl7_now, normalize_dob, to_hl7_timestamp};
pub use validate::{validate_creation_time, validate_patient_id, validate_source_id};

/// Assigning authority OID for the national health identifier.
pub const HEALTH_ID_OID: &str = "2.16.840.1.113883.3.3731.1.1.100.1";

/// Root OID under which all national organisation identifiers are issued.
pub const NATIONAL_ORG_ROOT: &str = "2.16.840.1.113883.3.3731";

/// HL7 version emitted in MSH-12 when the caller does not override it.
pub const HL7_VERSION: &str = "2.5.1";

/// Fixed ebXML identification schemes and classification URNs (ITI-41).
pub mod scheme {
    /// Identification scheme for the SubmissionSet unique id.
    pub const SUBMISSION_SET_UNIQUE_ID: &str = "urn:uuid:96fdda7c-d067-4183-912e-bf5ee74998a8";
    /// Identification scheme for DocumentEntry external identifiers.
    pub const DOCUMENT_UNIQUE_ID: &str = "urn:uuid:58a6f841-87b3-4a3e-92fd-a8ffeff98427";
    /// objectType attribute for on-demand document entries.
    pub const OBJECT_TYPE_ON_DEMAND: &str = "urn:uuid:34268e47-fdf5-41a6-ba33-82133c465248";
    /// objectType attribute for stable document entries.
    pub const OBJECT_TYPE_STABLE: &str = "urn:uuid:7edca82f-054d-47f2-a032-9b2a5b5186c1";
    /// National classification scheme for document class codes.
    pub const CLASS_CODE: &str = "urn:ksa-ehealth:classcodes:2023";
    /// IHE classification scheme for document type codes.
    pub const TYPE_CODE: &str = "urn:uuid:aa543740-bdda-424e-8c96-df4873be8500";
    /// formatCode for scanned/derived PDF content.
    pub const FORMAT_PDF: &str = "urn:ihe:iti:xds-sd:pdf:2008";
    /// formatCode fallback for content the exchange has no format for.
    pub const FORMAT_UNKNOWN: &str = "urn:ksa-ehealth:format:unknown";
    /// Association type linking a SubmissionSet to its DocumentEntry.
    pub const ASSOCIATION_HAS_MEMBER: &str =
        "urn:oasis:names:tc:ebxml-regrep:AssociationType:HasMember";
    /// Registry status stamped on the submission association.
    pub const STATUS_APPROVED: &str = "urn:oasis:names:tc:ebxml-regrep:StatusType:Approved";
    /// Default WS-Addressing action for ProvideAndRegisterDocumentSet-b.
    pub const DEFAULT_ACTION: &str = "urn:ihe:iti:2007:ProvideAndRegisterDocumentSet-b";
}

/// XML namespace URIs and the fixed prefixes the writer binds them to.
///
/// The prefix table is static and immutable: it is declared once on the SOAP
/// envelope root and never mutated afterwards, so concurrent encodes share it
/// without coordination.
pub mod ns {
    pub const SOAP_ENV: &str = "http://www.w3.org/2003/05/soap-envelope";
    pub const WS_ADDRESSING: &str = "http://www.w3.org/2005/08/addressing";
    pub const XDS_B: &str = "urn:ihe:iti:xds-b:2007";
    pub const EB_RIM: &str = "urn:oasis:names:tc:ebxml-regrep:xsd:rim:3.0";
    pub const EB_LCM: &str = "urn:oasis:names:tc:ebxml-regrep:xsd:lcm:3.0";
    pub const XOP_INCLUDE: &str = "http://www.w3.org/2004/08/xop/include";

    /// Prefix bindings declared on the envelope root, in declaration order.
    pub const PREFIXES: [(&str, &str); 5] = [
        ("s", SOAP_ENV),
        ("a", WS_ADDRESSING),
        ("xds", XDS_B),
        ("rim", EB_RIM),
        ("lcm", EB_LCM),
    ];
}

/// A patient identifier with its assigning authority.
///
/// The assigning authority defaults to the national health-id OID; callers
/// listing secondary identifiers (prior ids, facility MRNs) supply their own
/// authority explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identifier {
    /// Identifier value as issued by the assigning authority.
    pub id: String,

    /// OID of the assigning authority.
    #[serde(default = "default_assigning_authority")]
    pub assigning_authority: Option<String>,

    /// Optional identifier type code.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub id_type: Option<String>,
}

fn default_assigning_authority() -> Option<String> {
    Some(HEALTH_ID_OID.to_owned())
}

/// Errors returned by the shared input validators.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("patient_id must be formatted as '<Id>^^^&{0}&ISO'")]
    PatientIdFormat(&'static str),

    #[error("source_id must start with {0}")]
    SourceIdPrefix(&'static str),

    #[error("creation_time must be ISO8601 or HL7 TS (YYYYMMDD[HHMMSS])")]
    CreationTimeFormat,
}
