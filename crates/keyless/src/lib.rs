//! Keyless artifact verification for Sigstore bundles.
//!
//! Answers one question: does a signature bundle validly attest to an
//! artifact digest through Sigstore's keyless signing flow, against a
//! TUF-distributed trusted root?
//!
//! ```no_run
//! use keyless::{KeylessVerifier, VerificationOptions};
//! use keyless::types::Bundle;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let verifier = KeylessVerifier::builder().public_defaults()?.build().await?;
//! let bundle = Bundle::from_json(&std::fs::read_to_string("artifact.sigstore.json")?)?;
//! let digest = keyless::crypto::sha256(std::fs::read("artifact")?);
//! verifier.verify(&digest, &bundle, &VerificationOptions::empty())?;
//! # Ok(())
//! # }
//! ```

pub use keyless_trust_root::{TrustedRoot, TrustedRootProvider};
pub use keyless_types::{Bundle, Sha256Hash};
pub use keyless_verify::{
    CertificateMatcher, Error, KeylessVerifier, StringMatcher, VerificationOptions,
};

/// The error type surfaced to callers of [`KeylessVerifier::verify`].
pub type KeylessVerificationError = keyless_verify::Error;

pub use keyless_crypto as crypto;
pub use keyless_merkle as merkle;
pub use keyless_trust_root as trust_root;
pub use keyless_tuf as tuf;
pub use keyless_types as types;
pub use keyless_verify as verify;
