//! Public key parsing.
//!
//! Keys arrive in three shapes: PEM blocks inside hashed-rekord bodies and
//! trust material (`PUBLIC KEY`, legacy `RSA PUBLIC KEY`), DER
//! SubjectPublicKeyInfo inside certificates and the trusted root, and the
//! raw forms TUF metadata uses (uncompressed EC points, raw Ed25519 keys).
//! Everything normalizes to a DER SPKI plus a detected algorithm.

use crate::error::{Error, Result};
use const_oid::db::rfc5912::{ID_EC_PUBLIC_KEY, RSA_ENCRYPTION, SECP_256_R_1, SECP_384_R_1};
use const_oid::db::rfc8410::ID_ED_25519;
use const_oid::ObjectIdentifier;
use der::asn1::{BitString, Null};
use der::{Any, Decode, Encode};
use keyless_types::DerPublicKey;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

const ID_DSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10040.4.1");

/// Supported public key algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa,
    EcdsaP256,
    EcdsaP384,
    Ed25519,
}

/// A parsed public key: DER SPKI bytes plus the detected algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    spki: DerPublicKey,
    algorithm: KeyAlgorithm,
}

impl PublicKey {
    /// Parse a PEM-encoded public key.
    ///
    /// Accepts `PUBLIC KEY` (PKIX) and `RSA PUBLIC KEY` (PKCS#1, wrapped
    /// into PKIX before use). Anything else is `BadKeyFormat`.
    pub fn from_pem(pem_bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(pem_bytes)
            .map_err(|_| Error::BadKeyFormat("key is not valid UTF-8 PEM".into()))?;
        let block =
            pem::parse(text).map_err(|e| Error::BadKeyFormat(format!("not a PEM block: {e}")))?;
        match block.tag() {
            "PUBLIC KEY" => Self::from_spki_der(block.contents()),
            "RSA PUBLIC KEY" => {
                let spki = wrap_pkcs1(block.contents())?;
                Ok(Self {
                    spki: DerPublicKey::new(spki),
                    algorithm: KeyAlgorithm::Rsa,
                })
            }
            other => Err(Error::BadKeyFormat(format!(
                "unsupported PEM block type: {other}"
            ))),
        }
    }

    /// Parse a DER-encoded SubjectPublicKeyInfo.
    pub fn from_spki_der(der_bytes: &[u8]) -> Result<Self> {
        let spki = SubjectPublicKeyInfoOwned::from_der(der_bytes)
            .map_err(|e| Error::BadKeyFormat(format!("invalid SPKI: {e}")))?;
        let algorithm = detect_algorithm(&spki)?;
        Ok(Self {
            spki: DerPublicKey::new(der_bytes.to_vec()),
            algorithm,
        })
    }

    /// Construct a key from TUF metadata material.
    ///
    /// `ecdsa-sha2-nistp256` takes a 65-byte uncompressed point (leading
    /// `0x04`), or PEM/SPKI forms for repositories that publish those.
    /// `ed25519` takes a raw 32-byte key or a DER SPKI. The `rsassa-pss-*`
    /// schemes are not valid TUF verification keys here.
    pub fn from_tuf(raw: &[u8], scheme: &str) -> Result<Self> {
        if scheme.starts_with("rsassa-pss") {
            return Err(Error::UnsupportedAlgorithm(format!(
                "{scheme} is not a supported TUF key scheme"
            )));
        }
        match scheme {
            "ecdsa-sha2-nistp256" | "ecdsa" => {
                if raw.len() == 65 && raw[0] == 0x04 {
                    let spki = wrap_ec_point(raw, SECP_256_R_1)?;
                    return Ok(Self {
                        spki: DerPublicKey::new(spki),
                        algorithm: KeyAlgorithm::EcdsaP256,
                    });
                }
                if raw.starts_with(b"-----BEGIN") {
                    return Self::from_pem(raw);
                }
                Self::from_spki_der(raw)
            }
            "ed25519" => {
                if raw.len() == 32 {
                    let spki = wrap_ed25519(raw)?;
                    return Ok(Self {
                        spki: DerPublicKey::new(spki),
                        algorithm: KeyAlgorithm::Ed25519,
                    });
                }
                Self::from_spki_der(raw)
            }
            other => Err(Error::UnsupportedAlgorithm(format!(
                "unknown TUF key scheme: {other}"
            ))),
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// The DER SubjectPublicKeyInfo.
    pub fn spki(&self) -> &DerPublicKey {
        &self.spki
    }

    /// The raw content of the SPKI bit string: the uncompressed point for
    /// EC keys, the PKCS#1 block for RSA, the 32-byte key for Ed25519.
    pub fn raw_bits(&self) -> Result<Vec<u8>> {
        let spki = SubjectPublicKeyInfoOwned::from_der(self.spki.as_bytes())
            .map_err(|e| Error::BadKeyFormat(format!("invalid SPKI: {e}")))?;
        let bits = spki
            .subject_public_key
            .as_bytes()
            .ok_or_else(|| Error::BadKeyFormat("SPKI bit string has unused bits".into()))?;
        Ok(bits.to_vec())
    }
}

fn detect_algorithm(spki: &SubjectPublicKeyInfoOwned) -> Result<KeyAlgorithm> {
    let oid = spki.algorithm.oid;
    if oid == RSA_ENCRYPTION {
        return Ok(KeyAlgorithm::Rsa);
    }
    if oid == ID_ED_25519 {
        return Ok(KeyAlgorithm::Ed25519);
    }
    if oid == ID_DSA {
        return Err(Error::UnsupportedAlgorithm("DSA keys are not supported".into()));
    }
    if oid == ID_EC_PUBLIC_KEY {
        let params = spki
            .algorithm
            .parameters
            .as_ref()
            .ok_or_else(|| Error::BadKeyFormat("EC key is missing curve parameters".into()))?;
        let curve = ObjectIdentifier::from_bytes(params.value())
            .map_err(|e| Error::BadKeyFormat(format!("invalid EC curve OID: {e}")))?;
        return match curve {
            SECP_256_R_1 => Ok(KeyAlgorithm::EcdsaP256),
            SECP_384_R_1 => Ok(KeyAlgorithm::EcdsaP384),
            other => Err(Error::UnsupportedAlgorithm(format!(
                "unsupported EC curve: {other}"
            ))),
        };
    }
    Err(Error::UnsupportedAlgorithm(format!(
        "unknown key algorithm OID: {oid}"
    )))
}

/// Wrap a PKCS#1 `RSAPublicKey` into a PKIX SubjectPublicKeyInfo.
fn wrap_pkcs1(pkcs1: &[u8]) -> Result<Vec<u8>> {
    // sanity-check the inner structure before wrapping
    der::asn1::AnyRef::from_der(pkcs1)
        .map_err(|e| Error::BadKeyFormat(format!("invalid PKCS#1 key: {e}")))?;
    let spki = SubjectPublicKeyInfoOwned {
        algorithm: AlgorithmIdentifierOwned {
            oid: RSA_ENCRYPTION,
            parameters: Some(Any::encode_from(&Null)?),
        },
        subject_public_key: BitString::from_bytes(pkcs1)?,
    };
    Ok(spki.to_der()?)
}

/// Wrap an uncompressed EC point into a SubjectPublicKeyInfo for `curve`.
pub(crate) fn wrap_ec_point(point: &[u8], curve: ObjectIdentifier) -> Result<Vec<u8>> {
    if point.first() != Some(&0x04) {
        return Err(Error::BadKeyFormat(
            "EC point must be uncompressed (leading 0x04)".into(),
        ));
    }
    let spki = SubjectPublicKeyInfoOwned {
        algorithm: AlgorithmIdentifierOwned {
            oid: ID_EC_PUBLIC_KEY,
            parameters: Some(Any::encode_from(&curve)?),
        },
        subject_public_key: BitString::from_bytes(point)?,
    };
    Ok(spki.to_der()?)
}

/// Wrap a raw 32-byte Ed25519 key into a SubjectPublicKeyInfo.
pub(crate) fn wrap_ed25519(raw: &[u8]) -> Result<Vec<u8>> {
    let spki = SubjectPublicKeyInfoOwned {
        algorithm: AlgorithmIdentifierOwned {
            oid: ID_ED_25519,
            parameters: None,
        },
        subject_public_key: BitString::from_bytes(raw)?,
    };
    Ok(spki.to_der()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;

    // P-256 SPKI from the Rekor public-good log.
    const P256_SPKI_B64: &str = "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEYI4heOTrNrZO27elFE8ynfrdPMikttRkbe+vJKQ50G6bfwQ3WyhLpRwwwohelDAm8xRzJ56nYsIa3VHivVvpmA==";

    fn p256_spki() -> Vec<u8> {
        BASE64.decode(P256_SPKI_B64).unwrap()
    }

    #[test]
    fn detects_p256_from_spki() {
        let key = PublicKey::from_spki_der(&p256_spki()).unwrap();
        assert_eq!(key.algorithm(), KeyAlgorithm::EcdsaP256);
        let bits = key.raw_bits().unwrap();
        assert_eq!(bits.len(), 65);
        assert_eq!(bits[0], 0x04);
    }

    #[test]
    fn pem_roundtrip_preserves_spki() {
        let pem_text = format!(
            "-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----\n",
            P256_SPKI_B64
        );
        let key = PublicKey::from_pem(pem_text.as_bytes()).unwrap();
        assert_eq!(key.spki().as_bytes(), p256_spki().as_slice());
    }

    #[test]
    fn rejects_non_pem_input() {
        assert!(matches!(
            PublicKey::from_pem(b"not a key"),
            Err(Error::BadKeyFormat(_))
        ));
    }

    #[test]
    fn tuf_nistp256_wraps_raw_point() {
        let spki_key = PublicKey::from_spki_der(&p256_spki()).unwrap();
        let point = spki_key.raw_bits().unwrap();
        let wrapped = PublicKey::from_tuf(&point, "ecdsa-sha2-nistp256").unwrap();
        assert_eq!(wrapped.spki().as_bytes(), p256_spki().as_slice());
    }

    #[test]
    fn tuf_ed25519_accepts_raw_key() {
        let raw = [7u8; 32];
        let key = PublicKey::from_tuf(&raw, "ed25519").unwrap();
        assert_eq!(key.algorithm(), KeyAlgorithm::Ed25519);
        assert_eq!(key.raw_bits().unwrap(), raw);
    }

    #[test]
    fn tuf_rejects_rsassa_pss_schemes() {
        assert!(matches!(
            PublicKey::from_tuf(&[0u8; 65], "rsassa-pss-sha256"),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn tuf_rejects_compressed_point() {
        let mut point = [0u8; 65];
        point[0] = 0x02;
        assert!(PublicKey::from_tuf(&point[..33], "ecdsa-sha2-nistp256").is_err());
    }
}
