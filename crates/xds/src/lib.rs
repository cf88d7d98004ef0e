//! IHE ITI-41 (XDS.b) wire/boundary support.
//!
//! This crate translates between the JSON intermediate representation of a
//! document submission and the ebXML/SOAP `ProvideAndRegisterDocumentSet-b`
//! wire format:
//! - envelope encoding: SubmissionSet (RegistryPackage) + DocumentEntry
//!   (ExtrinsicObject) + HasMember Association, with fixed namespace
//!   prefixes declared once on the envelope root
//! - attachment transport selection: inline base64 below 256 KiB, MTOM/XOP
//!   multipart at or above it
//! - namespace-agnostic decode of arbitrary ebXML documents into a flat
//!   JSON summary
//! - SOAP 1.2 fault rendering for encode-time failures

pub mod decode;
pub mod encode;
pub mod fault;
pub mod models;
pub mod mtom;

// Re-export facades
pub use decode::{decode_document, DocumentSummary};
pub use encode::XdsCodec;
pub use fault::build_soap_fault;
pub use models::{SoapAddressing, SubmissionRequest};
pub use mtom::{
    rewrite_document_as_xop, select_transport, MtomPackage, TransportArtifact,
    MTOM_THRESHOLD_BYTES,
};

/// Errors returned by the `hie-xds` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum XdsError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] hie_types::ValidationError),

    #[error("failed to parse ITI-41 XML: {0}")]
    InvalidXml(String),

    #[error("failed to build ITI-41 XML: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Results that can fail with an [`XdsError`].
pub type XdsResult<T> = Result<T, XdsError>;

/// Advisory schema validation over an assembled ebXML document.
///
/// Selected once at process construction. The encoder invokes it on the
/// finished envelope; a returned `Err` is logged as a warning and never
/// blocks the primary result. Implementations are expected to return
/// promptly, since the outcome is advisory only.
pub trait SchemaValidate: Send + Sync {
    /// Validate `xml` against the registry schemas.
    ///
    /// Returns `Err` with a human-readable description of the violations.
    fn validate(&self, xml: &str) -> Result<(), String>;
}

/// Default schema capability: accepts every document.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSchemaValidator;

impl SchemaValidate for NoopSchemaValidator {
    fn validate(&self, _xml: &str) -> Result<(), String> {
        Ok(())
    }
}
