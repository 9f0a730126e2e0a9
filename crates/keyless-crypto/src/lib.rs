//! Cryptographic primitives for keyless verification.
//!
//! Key parsing, signature verification over messages and precomputed
//! digests, X.509 helpers for the Fulcio certificate profile, and the
//! signed-note checkpoint format. aws-lc-rs is the backend for all
//! signature math.

pub mod error;
pub mod hash;
pub mod keys;
pub mod note;
pub mod signing;
pub mod verifier;
pub mod x509;

pub use error::{Error, Result};
pub use hash::{sha256, sha384};
pub use keys::{KeyAlgorithm, PublicKey};
pub use note::{compute_key_hint, NoteSignature, SignedNote};
pub use signing::KeyPair;
pub use verifier::Verifier;
