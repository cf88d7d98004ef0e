//! HL7 v2.5.1 wire/boundary support.
//!
//! This crate translates between the JSON intermediate representation of a
//! clinical encounter (admission/demographic data) and HL7 v2.5.1
//! pipe-delimited segment messages.
//!
//! This crate focuses on:
//! - segment encoding with the fixed ADT segment order and field positions
//! - reversible escaping of reserved delimiter characters in free text
//! - a deliberately partial, position-indexed decode back to JSON
//!
//! The decode path is deliberately lossy: each segment contributes a fixed
//! set of field indices and nothing else, and escaped text is *not*
//! unescaped on the way back. Round-trips preserve field positions, not
//! full fidelity.

pub mod decode;
pub mod encode;
pub mod escape;
pub mod models;

// Re-export facades
pub use decode::{decode_message, DecodedAdt};
pub use encode::AdtCodec;
pub use escape::escape_field;

// Re-export public wire models
pub use models::{
    AdditionalDemographics, AdtMessage, Allergy, Diagnosis, Guarantor, InsuranceCoverage,
    MergeRecord, MessageHeader, NextOfKin, PatientDemographics, Procedure, Visit,
};

/// Errors returned by the `hie-hl7` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum Hl7Error {
    #[error("patient first identifier assigning_authority must be {0}")]
    IdentifierAuthority(&'static str),
}

/// Type alias for Results that can fail with a [`Hl7Error`].
pub type Hl7Result<T> = Result<T, Hl7Error>;

/// Advisory conformance check over an assembled HL7 message.
///
/// Selected once at process construction. The encoder invokes it on the
/// fully assembled message; a returned `Err` is logged as a warning and
/// never blocks the primary result. Implementations are expected to return
/// promptly, since the outcome is advisory only.
pub trait ConformanceCheck: Send + Sync {
    /// Check `message` for gross conformance errors.
    ///
    /// Returns `Err` with a human-readable description of the issues found.
    fn check(&self, message: &str) -> Result<(), String>;
}

/// Default conformance capability: accepts every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopConformance;

impl ConformanceCheck for NoopConformance {
    fn check(&self, _message: &str) -> Result<(), String> {
        Ok(())
    }
}
