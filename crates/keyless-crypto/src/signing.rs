//! Key pair generation and signing.
//!
//! Verification never signs, but fixture construction does: tests across
//! the workspace mint throwaway keys to produce SETs, checkpoint notes, and
//! TUF metadata signatures.

use crate::error::{Error, Result};
use crate::keys::{wrap_ec_point, wrap_ed25519};
use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::signature::{EcdsaKeyPair, Ed25519KeyPair, KeyPair as _, ECDSA_P256_SHA256_ASN1_SIGNING};
use const_oid::db::rfc5912::SECP_256_R_1;
use keyless_types::{DerPublicKey, SignatureBytes};

/// An in-memory signing key pair.
pub enum KeyPair {
    EcdsaP256(EcdsaKeyPair),
    Ed25519(Ed25519KeyPair),
}

impl KeyPair {
    pub fn generate_ecdsa_p256() -> Result<Self> {
        let kp = EcdsaKeyPair::generate(&ECDSA_P256_SHA256_ASN1_SIGNING)
            .map_err(|e| Error::KeyGeneration(e.to_string()))?;
        Ok(KeyPair::EcdsaP256(kp))
    }

    pub fn generate_ed25519() -> Result<Self> {
        let kp = Ed25519KeyPair::generate().map_err(|e| Error::KeyGeneration(e.to_string()))?;
        Ok(KeyPair::Ed25519(kp))
    }

    /// Sign `data`. ECDSA signatures are ASN.1 `ECDSA-Sig-Value`; Ed25519
    /// signatures are the raw 64-byte form.
    pub fn sign(&self, data: &[u8]) -> Result<SignatureBytes> {
        match self {
            KeyPair::EcdsaP256(kp) => {
                let rng = SystemRandom::new();
                let sig = kp
                    .sign(&rng, data)
                    .map_err(|e| Error::KeyGeneration(format!("signing failed: {e}")))?;
                Ok(SignatureBytes::new(sig.as_ref().to_vec()))
            }
            KeyPair::Ed25519(kp) => Ok(SignatureBytes::new(kp.sign(data).as_ref().to_vec())),
        }
    }

    /// The raw public key: uncompressed point or 32-byte Ed25519 key.
    pub fn public_key_raw(&self) -> &[u8] {
        match self {
            KeyPair::EcdsaP256(kp) => kp.public_key().as_ref(),
            KeyPair::Ed25519(kp) => kp.public_key().as_ref(),
        }
    }

    /// The public key as a DER SubjectPublicKeyInfo.
    pub fn public_key_der(&self) -> Result<DerPublicKey> {
        let der = match self {
            KeyPair::EcdsaP256(kp) => wrap_ec_point(kp.public_key().as_ref(), SECP_256_R_1)?,
            KeyPair::Ed25519(kp) => wrap_ed25519(kp.public_key().as_ref())?,
        };
        Ok(DerPublicKey::new(der))
    }
}
