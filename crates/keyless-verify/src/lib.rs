//! Keyless bundle verification.
//!
//! Composes the certificate (Fulcio), transparency log (Rekor), and raw
//! signature checks into one ordered decision over a
//! `(artifact digest, bundle, options)` input. The first failing step
//! terminates verification and is reported as the diagnostic.

pub mod error;
pub mod fulcio;
pub mod hashedrekord;
pub mod matchers;
pub mod options;
pub mod rekor;
pub mod verifier;

pub use error::{Error, FulcioError, RekorError, Result};
pub use fulcio::FulcioVerifier;
pub use matchers::{CertificateField, CertificateMatcher, MatcherError, StringMatcher};
pub use options::VerificationOptions;
pub use rekor::RekorVerifier;
pub use verifier::{KeylessVerifier, KeylessVerifierBuilder};
