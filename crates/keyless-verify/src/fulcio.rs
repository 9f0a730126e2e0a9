//! Fulcio certificate verification.
//!
//! Decides whether a signing certificate was issued by a trusted CA that
//! was active when the certificate became valid, and whether it embeds at
//! least one Signed Certificate Timestamp verifiable under a trusted CT
//! log key. Path building follows PKIX rules via webpki, with trust
//! anchors injected per-CA from the trusted root so that anchors from
//! different CAs are never mixed in one attempt.

use const_oid::db::rfc5912::ID_KP_CODE_SIGNING;
use keyless_crypto::{verifier, x509, PublicKey};
use keyless_trust_root::{CertificateAuthority, TrustedRoot};
use keyless_types::{DerCertificate, DerPublicKey, LogId, SignatureBytes};
use rustls_pki_types::{CertificateDer, UnixTime};
use tls_codec::{SerializeBytes, TlsByteVecU16, TlsByteVecU24, TlsSerializeBytes, TlsSize};
use webpki::{anchor_from_trusted_cert, EndEntityCert, KeyUsage, ALL_VERIFICATION_ALGS};
use x509_cert::ext::pkix::sct::Version;
use x509_cert::ext::pkix::{SignedCertificateTimestamp, SignedCertificateTimestampList};
use x509_cert::Certificate;

use crate::error::FulcioError;

type Result<T> = std::result::Result<T, FulcioError>;

/// Verifies signing certificates against the trusted root's CAs and CT
/// log keys.
pub struct FulcioVerifier {
    trusted_root: TrustedRoot,
}

impl FulcioVerifier {
    pub fn new(trusted_root: &TrustedRoot) -> Self {
        Self {
            trusted_root: trusted_root.clone(),
        }
    }

    /// Verify a certificate path: chain building to a trusted CA active at
    /// the leaf's notBefore, at least one valid embedded SCT, and the leaf
    /// signing profile.
    pub fn verify_signing_certificate(&self, cert_path: &[&DerCertificate]) -> Result<()> {
        let leaf_der = cert_path
            .first()
            .ok_or_else(|| FulcioError::ChainBuildFailed("certificate path is empty".into()))?;
        let leaf = x509::parse(leaf_der.as_bytes())
            .map_err(|e| FulcioError::ChainBuildFailed(e.to_string()))?;
        let (not_before, _) = x509::validity(&leaf);

        // CAs active when the certificate became valid, most recently
        // started first. Each is tried as an isolated anchor set.
        let candidates = self.trusted_root.cas_valid_at(not_before);
        if candidates.is_empty() {
            return Err(FulcioError::UntrustedCa);
        }

        let intermediates = x509::intermediates(cert_path);
        let mut last_failure = String::new();
        let mut issuing_ca = None;
        for ca in candidates {
            match build_path(ca, leaf_der, &intermediates, not_before) {
                Ok(()) => {
                    issuing_ca = Some(ca);
                    break;
                }
                Err(e) => last_failure = e,
            }
        }
        let issuing_ca = issuing_ca.ok_or(FulcioError::ChainBuildFailed(last_failure))?;

        // SCT verification needs the issuer's key hash; find the issuer
        // among the supplied intermediates or the CA chain itself.
        let issuer_spki = find_issuer_spki(&leaf, cert_path, issuing_ca)?;
        self.verify_embedded_scts(&leaf, &issuer_spki)?;

        x509::check_leaf_constraints(&leaf)
            .map_err(|e| FulcioError::BadLeafConstraints(e.to_string()))?;

        Ok(())
    }

    /// Accept the leaf when any embedded SCT verifies under a trusted CT
    /// log key that was valid at the SCT's own timestamp.
    fn verify_embedded_scts(&self, leaf: &Certificate, issuer_spki: &DerPublicKey) -> Result<()> {
        let scts = embedded_scts(leaf)?;
        if scts.is_empty() {
            return Err(FulcioError::MissingSct);
        }

        let issuer_key_hash = *keyless_crypto::sha256(issuer_spki.as_bytes()).as_bytes();
        let verified = scts
            .iter()
            .any(|sct| self.verify_one_sct(leaf, sct, issuer_key_hash));
        if !verified {
            return Err(FulcioError::NoValidSct);
        }
        Ok(())
    }

    fn verify_one_sct(
        &self,
        leaf: &Certificate,
        sct: &SignedCertificateTimestamp,
        issuer_key_hash: [u8; 32],
    ) -> bool {
        let log_id = LogId::new(sct.log_id.key_id.to_vec());
        let Some(log) = self.trusted_root.ctlog_by_id(&log_id) else {
            tracing::debug!(log_id = %log_id.to_hex(), "SCT names an untrusted CT log");
            return false;
        };
        // SCT timestamps are milliseconds since the epoch.
        if !log.valid_at((sct.timestamp / 1000) as i64) {
            tracing::debug!(log_id = %log_id.to_hex(), "CT log key not valid at SCT timestamp");
            return false;
        }

        let signed_data = match DigitallySigned::from_embedded_sct(leaf, sct, issuer_key_hash)
            .and_then(|ds| {
                ds.tls_serialize()
                    .map_err(|e| FulcioError::ChainBuildFailed(e.to_string()))
            }) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!("could not reconstruct SCT signed data: {e}");
                return false;
            }
        };

        let Ok(key) = PublicKey::from_spki_der(log.public_key.raw_bytes.as_bytes()) else {
            return false;
        };
        let Ok(alg_bytes) = sct.signature.algorithm.tls_serialize() else {
            return false;
        };
        let algorithm = u16::from_be_bytes([alg_bytes[0], alg_bytes[1]]);
        let signature = SignatureBytes::new(sct.signature.signature.clone().into());

        verifier::verify_with_tls_algorithm(&key, algorithm, &signed_data, &signature).is_ok()
    }
}

/// Attempt PKIX path building from the leaf to one CA's anchors at `time`,
/// enforcing the code-signing extended key usage.
fn build_path(
    ca: &CertificateAuthority,
    leaf_der: &DerCertificate,
    intermediates: &[DerCertificate],
    time: i64,
) -> std::result::Result<(), String> {
    let ca_ders: Vec<CertificateDer<'static>> = ca
        .certificates()
        .map(|c| CertificateDer::from(c.as_bytes().to_vec()))
        .collect();

    let anchors: Vec<_> = ca_ders
        .iter()
        .filter_map(|der| anchor_from_trusted_cert(der).map(|a| a.to_owned()).ok())
        .collect();
    if anchors.is_empty() {
        return Err("no usable trust anchors in CA chain".into());
    }

    // The CA's own chain doubles as an intermediate pool; webpki ignores
    // certificates it does not need.
    let mut pool: Vec<CertificateDer<'static>> = intermediates
        .iter()
        .map(|c| CertificateDer::from(c.as_bytes().to_vec()))
        .collect();
    pool.extend(ca_ders.iter().cloned());

    let leaf = CertificateDer::from(leaf_der.as_bytes());
    let end_entity = EndEntityCert::try_from(&leaf).map_err(|e| e.to_string())?;

    end_entity
        .verify_for_usage(
            ALL_VERIFICATION_ALGS,
            &anchors,
            &pool,
            UnixTime::since_unix_epoch(std::time::Duration::from_secs(time.max(0) as u64)),
            KeyUsage::required(ID_KP_CODE_SIGNING.as_bytes()),
            None,
            None,
        )
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// The issuer's SubjectPublicKeyInfo, from the bundle chain or the CA's
/// published chain, matched by distinguished name.
fn find_issuer_spki(
    leaf: &Certificate,
    cert_path: &[&DerCertificate],
    ca: &CertificateAuthority,
) -> Result<DerPublicKey> {
    let issuer_name = &leaf.tbs_certificate.issuer;

    let supplied = cert_path.iter().skip(1).map(|c| c.as_bytes().to_vec());
    let published = ca.certificates().map(|c| c.as_bytes().to_vec());
    for der in supplied.chain(published) {
        let Ok(cert) = x509::parse(&der) else {
            continue;
        };
        if &cert.tbs_certificate.subject == issuer_name {
            return x509::spki_der(&cert)
                .map_err(|e| FulcioError::ChainBuildFailed(e.to_string()));
        }
    }
    Err(FulcioError::ChainBuildFailed(
        "could not locate the issuer certificate for SCT verification".into(),
    ))
}

/// All SCTs embedded in the leaf's SCT list extension.
fn embedded_scts(leaf: &Certificate) -> Result<Vec<SignedCertificateTimestamp>> {
    let list: Option<(bool, SignedCertificateTimestampList)> = leaf
        .tbs_certificate
        .get()
        .map_err(|_| FulcioError::MissingSct)?;
    let Some((_, list)) = list else {
        return Err(FulcioError::MissingSct);
    };

    let serialized = list.parse_timestamps().map_err(|_| FulcioError::MissingSct)?;
    let mut scts = Vec::with_capacity(serialized.len());
    for entry in serialized {
        scts.push(entry.parse_timestamp().map_err(|_| FulcioError::MissingSct)?);
    }
    Ok(scts)
}

// RFC 6962 §3.2: the TLS-encoded structure a CT log signs for an embedded
// (pre-certificate) SCT.

#[derive(TlsSerializeBytes, TlsSize)]
#[repr(u8)]
enum SignatureType {
    CertificateTimestamp = 0,
}

#[derive(TlsSerializeBytes, TlsSize)]
struct PreCert {
    issuer_key_hash: [u8; 32],
    tbs_certificate: TlsByteVecU24,
}

#[derive(TlsSerializeBytes, TlsSize)]
#[repr(u16)]
enum SignedEntry {
    #[tls_codec(discriminant = 1)]
    PrecertEntry(PreCert),
}

#[derive(TlsSerializeBytes, TlsSize)]
struct DigitallySigned {
    version: Version,
    signature_type: SignatureType,
    timestamp: u64,
    signed_entry: SignedEntry,
    extensions: TlsByteVecU16,
}

impl DigitallySigned {
    fn from_embedded_sct(
        cert: &Certificate,
        sct: &SignedCertificateTimestamp,
        issuer_key_hash: [u8; 32],
    ) -> Result<Self> {
        let tbs = x509::tbs_without_sct(cert)
            .map_err(|e| FulcioError::ChainBuildFailed(e.to_string()))?;
        Ok(DigitallySigned {
            version: match sct.version {
                Version::V1 => Version::V1,
            },
            signature_type: SignatureType::CertificateTimestamp,
            timestamp: sct.timestamp,
            signed_entry: SignedEntry::PrecertEntry(PreCert {
                issuer_key_hash,
                tbs_certificate: tbs.as_slice().into(),
            }),
            extensions: sct.extensions.clone(),
        })
    }
}
