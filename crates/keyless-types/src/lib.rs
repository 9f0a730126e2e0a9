//! Data model for Sigstore keyless verification.
//!
//! This crate defines the bundle format consumed by verification, the
//! transparency log entry shape, and the encoding newtypes shared by the
//! rest of the workspace.

pub mod bundle;
pub mod dsse;
pub mod encoding;
pub mod error;
pub mod hash;

pub use bundle::{
    Bundle, CertificateData, CheckpointEnvelope, InclusionPromise, InclusionProof, KindVersion,
    LogIdData, MediaType, MessageDigest, MessageSignature, RekorEntry, Rfc3161Timestamp,
    SignatureContent, TimestampVerificationData, VerificationMaterial, VerificationMaterialContent,
};
pub use dsse::DsseEnvelope;
pub use encoding::{
    string_i64, CanonicalizedBody, DerCertificate, DerPublicKey, LogId, Sha256Hash, SignatureBytes,
    SignedTimestamp, TimestampToken,
};
pub use error::{Error, Result};
pub use hash::HashAlgorithm;
