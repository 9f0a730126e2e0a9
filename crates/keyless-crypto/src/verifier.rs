//! Signature verification.
//!
//! A [`Verifier`] is a small tagged variant over the supported algorithm
//! suite. Adding an algorithm means adding an arm, nothing else. Each
//! variant can verify over a full message or over a precomputed digest;
//! for Ed25519 the "digest" is simply the signed message.

use crate::error::{Error, Result};
use crate::keys::{KeyAlgorithm, PublicKey};
use aws_lc_rs::digest::{self, Digest};
use aws_lc_rs::signature::{
    UnparsedPublicKey, VerificationAlgorithm, ECDSA_P256_SHA256_ASN1, ECDSA_P384_SHA384_ASN1,
    ED25519, RSA_PKCS1_2048_8192_SHA256, RSA_PSS_2048_8192_SHA256,
};
use keyless_types::SignatureBytes;

/// A verifier bound to one key and one algorithm.
pub enum Verifier {
    /// SHA256withRSA (PKCS#1 v1.5).
    RsaPkcs1Sha256(UnparsedPublicKey<Vec<u8>>),
    /// RSA-PSS with SHA-256.
    RsaPssSha256(UnparsedPublicKey<Vec<u8>>),
    /// SHA256withECDSA over P-256.
    EcdsaP256Sha256(UnparsedPublicKey<Vec<u8>>),
    /// SHA384withECDSA over P-384.
    EcdsaP384Sha384(UnparsedPublicKey<Vec<u8>>),
    /// Pure Ed25519.
    Ed25519(UnparsedPublicKey<Vec<u8>>),
}

impl Verifier {
    /// Build a verifier from a parsed key, dispatching on its algorithm.
    ///
    /// RSA keys default to PKCS#1 v1.5 padding; use [`Verifier::rsa_pss`]
    /// when PSS is known to apply.
    pub fn new(key: &PublicKey) -> Result<Self> {
        let bits = key.raw_bits()?;
        Ok(match key.algorithm() {
            KeyAlgorithm::Rsa => {
                Verifier::RsaPkcs1Sha256(UnparsedPublicKey::new(&RSA_PKCS1_2048_8192_SHA256, bits))
            }
            KeyAlgorithm::EcdsaP256 => {
                Verifier::EcdsaP256Sha256(UnparsedPublicKey::new(&ECDSA_P256_SHA256_ASN1, bits))
            }
            KeyAlgorithm::EcdsaP384 => {
                Verifier::EcdsaP384Sha384(UnparsedPublicKey::new(&ECDSA_P384_SHA384_ASN1, bits))
            }
            KeyAlgorithm::Ed25519 => Verifier::Ed25519(UnparsedPublicKey::new(&ED25519, bits)),
        })
    }

    /// Build an RSA-PSS verifier from an RSA key.
    pub fn rsa_pss(key: &PublicKey) -> Result<Self> {
        if key.algorithm() != KeyAlgorithm::Rsa {
            return Err(Error::UnsupportedAlgorithm(
                "PSS padding requires an RSA key".into(),
            ));
        }
        Ok(Verifier::RsaPssSha256(UnparsedPublicKey::new(
            &RSA_PSS_2048_8192_SHA256,
            key.raw_bits()?,
        )))
    }

    fn name(&self) -> &'static str {
        match self {
            Verifier::RsaPkcs1Sha256(_) => "RSA PKCS#1 SHA-256",
            Verifier::RsaPssSha256(_) => "RSA-PSS SHA-256",
            Verifier::EcdsaP256Sha256(_) => "ECDSA P-256 SHA-256",
            Verifier::EcdsaP384Sha384(_) => "ECDSA P-384 SHA-384",
            Verifier::Ed25519(_) => "Ed25519",
        }
    }

    fn key(&self) -> &UnparsedPublicKey<Vec<u8>> {
        match self {
            Verifier::RsaPkcs1Sha256(k)
            | Verifier::RsaPssSha256(k)
            | Verifier::EcdsaP256Sha256(k)
            | Verifier::EcdsaP384Sha384(k)
            | Verifier::Ed25519(k) => k,
        }
    }

    /// Verify `signature` over the full `message`.
    pub fn verify(&self, message: &[u8], signature: &SignatureBytes) -> Result<()> {
        self.key()
            .verify(message, signature.as_bytes())
            .map_err(|_| Error::InvalidSignature(format!("{} verification failed", self.name())))
    }

    /// Verify `signature` over a precomputed digest.
    ///
    /// Hash-then-sign schemes import the digest directly, skipping the hash
    /// step; the digest length must match the scheme's hash. Ed25519 has no
    /// prehashed mode, so the digest bytes are verified as the message.
    pub fn verify_digest(&self, digest_bytes: &[u8], signature: &SignatureBytes) -> Result<()> {
        let algorithm = match self {
            Verifier::Ed25519(_) => return self.verify(digest_bytes, signature),
            Verifier::EcdsaP384Sha384(_) => &digest::SHA384,
            _ => &digest::SHA256,
        };
        if digest_bytes.len() != algorithm.output_len() {
            return Err(Error::InvalidSignature(format!(
                "digest length {} does not match {}",
                digest_bytes.len(),
                self.name()
            )));
        }
        let imported = Digest::import_less_safe(digest_bytes, algorithm)
            .map_err(|_| Error::InvalidSignature("failed to import digest".into()))?;
        self.key()
            .verify_digest(&imported, signature.as_bytes())
            .map_err(|_| Error::InvalidSignature(format!("{} verification failed", self.name())))
    }
}

/// One-shot verification over a message.
pub fn verify_signature(key: &PublicKey, message: &[u8], signature: &SignatureBytes) -> Result<()> {
    Verifier::new(key)?.verify(message, signature)
}

/// One-shot verification over a precomputed digest.
pub fn verify_digest(key: &PublicKey, digest: &[u8], signature: &SignatureBytes) -> Result<()> {
    Verifier::new(key)?.verify_digest(digest, signature)
}

/// Verify with an explicit TLS `SignatureAndHashAlgorithm` pair, as used by
/// RFC 6962 SCT signatures.
pub fn verify_with_tls_algorithm(
    key: &PublicKey,
    tls_algorithm: u16,
    message: &[u8],
    signature: &SignatureBytes,
) -> Result<()> {
    let algorithm: &'static dyn VerificationAlgorithm = match tls_algorithm {
        0x0403 => &ECDSA_P256_SHA256_ASN1,
        0x0503 => &ECDSA_P384_SHA384_ASN1,
        0x0401 => &RSA_PKCS1_2048_8192_SHA256,
        other => {
            return Err(Error::UnsupportedAlgorithm(format!(
                "unsupported TLS signature algorithm: 0x{other:04x}"
            )))
        }
    };
    UnparsedPublicKey::new(algorithm, key.raw_bits()?)
        .verify(message, signature.as_bytes())
        .map_err(|_| Error::InvalidSignature("SCT signature verification failed".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256;
    use crate::signing::KeyPair;

    #[test]
    fn ecdsa_p256_message_roundtrip() {
        let kp = KeyPair::generate_ecdsa_p256().unwrap();
        let sig = kp.sign(b"payload").unwrap();
        let key = PublicKey::from_spki_der(kp.public_key_der().unwrap().as_bytes()).unwrap();
        assert!(verify_signature(&key, b"payload", &sig).is_ok());
        assert!(verify_signature(&key, b"tampered", &sig).is_err());
    }

    #[test]
    fn ecdsa_p256_digest_roundtrip() {
        let kp = KeyPair::generate_ecdsa_p256().unwrap();
        let sig = kp.sign(b"artifact contents").unwrap();
        let key = PublicKey::from_spki_der(kp.public_key_der().unwrap().as_bytes()).unwrap();

        let digest = sha256(b"artifact contents");
        assert!(verify_digest(&key, digest.as_bytes(), &sig).is_ok());

        let wrong = sha256(b"different contents");
        assert!(verify_digest(&key, wrong.as_bytes(), &sig).is_err());
    }

    #[test]
    fn digest_length_is_enforced() {
        let kp = KeyPair::generate_ecdsa_p256().unwrap();
        let sig = kp.sign(b"data").unwrap();
        let key = PublicKey::from_spki_der(kp.public_key_der().unwrap().as_bytes()).unwrap();
        assert!(verify_digest(&key, &[0u8; 20], &sig).is_err());
    }

    #[test]
    fn ed25519_digest_is_message() {
        let kp = KeyPair::generate_ed25519().unwrap();
        let digest = sha256(b"artifact contents");
        let sig = kp.sign(digest.as_bytes()).unwrap();
        let key = PublicKey::from_spki_der(kp.public_key_der().unwrap().as_bytes()).unwrap();
        assert!(verify_digest(&key, digest.as_bytes(), &sig).is_ok());
    }

    #[test]
    fn garbage_signature_fails() {
        let kp = KeyPair::generate_ecdsa_p256().unwrap();
        let key = PublicKey::from_spki_der(kp.public_key_der().unwrap().as_bytes()).unwrap();
        let bad = SignatureBytes::new(vec![0u8; 64]);
        assert!(verify_signature(&key, b"data", &bad).is_err());
    }
}
