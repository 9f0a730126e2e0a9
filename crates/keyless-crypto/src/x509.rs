//! X.509 utilities for the Fulcio certificate profile.
//!
//! Covers the handful of certificate operations verification needs: leaf
//! and intermediate selection from a bundle's chain, canonical PEM
//! encoding (byte-exact, because it feeds the hashed-rekord body
//! reconstruction), pre-certificate TBS recovery for SCT checks, leaf
//! profile constraints, and identity extraction for matchers.

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use const_oid::db::rfc5912::ID_KP_CODE_SIGNING;
use const_oid::db::rfc6962::CT_PRECERT_SCTS;
use const_oid::ObjectIdentifier;
use der::{Decode, Encode};
use keyless_types::{DerCertificate, DerPublicKey};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{BasicConstraints, ExtendedKeyUsage, KeyUsage, KeyUsages, SubjectAltName};
use x509_cert::Certificate;

/// Fulcio extension carrying the OIDC issuer URL (raw string form).
pub const FULCIO_ISSUER_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.57264.1.1");

/// Fulcio extension carrying the OIDC issuer URL (DER UTF8String form).
pub const FULCIO_ISSUER_V2_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.57264.1.8");

/// Parse a DER certificate.
pub fn parse(der_bytes: &[u8]) -> Result<Certificate> {
    Certificate::from_der(der_bytes)
        .map_err(|e| Error::Certificate(format!("failed to parse certificate: {e}")))
}

/// The first certificate of a bundle path: the signing leaf.
///
/// A leaf that claims CA status is rejected outright.
pub fn leaf(cert_path: &[&DerCertificate]) -> Result<Certificate> {
    let first = cert_path
        .first()
        .ok_or_else(|| Error::Certificate("certificate path is empty".into()))?;
    let cert = parse(first.as_bytes())?;
    if is_ca(&cert)? {
        return Err(Error::Certificate(
            "leaf certificate must not be a CA".into(),
        ));
    }
    Ok(cert)
}

/// Everything between the leaf and the final certificate of the path.
pub fn intermediates(cert_path: &[&DerCertificate]) -> Vec<DerCertificate> {
    if cert_path.len() <= 2 {
        return Vec::new();
    }
    cert_path[1..cert_path.len() - 1]
        .iter()
        .map(|c| (*c).clone())
        .collect()
}

/// Canonical PEM encoding of a DER certificate.
///
/// LF line endings, 64-column base64 wrapping, and a trailing LF. This is
/// the exact form Rekor hashes into hashed-rekord bodies, so it must not
/// drift by a byte.
pub fn to_pem_bytes(cert_der: &[u8]) -> Vec<u8> {
    let encoded = BASE64.encode(cert_der);
    let mut out = String::with_capacity(encoded.len() + 64);
    out.push_str("-----BEGIN CERTIFICATE-----\n");
    for chunk in encoded.as_bytes().chunks(64) {
        // chunks of an ASCII string are valid UTF-8
        out.push_str(std::str::from_utf8(chunk).expect("base64 is ASCII"));
        out.push('\n');
    }
    out.push_str("-----END CERTIFICATE-----\n");
    out.into_bytes()
}

/// The DER TBSCertificate with the SCT list extension removed.
///
/// Reproduces the pre-certificate bytes a CT log signed (RFC 6962 §3.2):
/// the extension sequence is filtered and re-encoded in canonical DER.
pub fn tbs_without_sct(cert: &Certificate) -> Result<Vec<u8>> {
    let mut tbs = cert.tbs_certificate.clone();
    tbs.extensions = tbs.extensions.map(|exts| {
        exts.into_iter()
            .filter(|ext| ext.extn_id != CT_PRECERT_SCTS)
            .collect()
    });
    let mut out = Vec::new();
    tbs.encode_to_vec(&mut out)
        .map_err(|e| Error::Certificate(format!("failed to encode pre-cert TBS: {e}")))?;
    Ok(out)
}

/// Whether the certificate asserts CA status via BasicConstraints.
pub fn is_ca(cert: &Certificate) -> Result<bool> {
    let bc: Option<(bool, BasicConstraints)> = cert
        .tbs_certificate
        .get()
        .map_err(|e| Error::Certificate(format!("failed to read BasicConstraints: {e}")))?;
    Ok(bc.map(|(_, bc)| bc.ca).unwrap_or(false))
}

/// Enforce the leaf profile: not a CA, extended key usage includes code
/// signing, key usage includes digitalSignature.
pub fn check_leaf_constraints(cert: &Certificate) -> Result<()> {
    if is_ca(cert)? {
        return Err(Error::Certificate("signing certificate is a CA".into()));
    }

    let eku: Option<(bool, ExtendedKeyUsage)> = cert
        .tbs_certificate
        .get()
        .map_err(|e| Error::Certificate(format!("failed to read ExtendedKeyUsage: {e}")))?;
    let has_code_signing = eku
        .map(|(_, eku)| eku.0.contains(&ID_KP_CODE_SIGNING))
        .unwrap_or(false);
    if !has_code_signing {
        return Err(Error::Certificate(
            "certificate lacks the code-signing extended key usage".into(),
        ));
    }

    let ku: Option<(bool, KeyUsage)> = cert
        .tbs_certificate
        .get()
        .map_err(|e| Error::Certificate(format!("failed to read KeyUsage: {e}")))?;
    let has_digital_signature = ku
        .map(|(_, ku)| ku.0.contains(KeyUsages::DigitalSignature))
        .unwrap_or(false);
    if !has_digital_signature {
        return Err(Error::Certificate(
            "certificate lacks the digitalSignature key usage".into(),
        ));
    }

    Ok(())
}

/// The certificate validity window as Unix timestamps `(not_before, not_after)`.
pub fn validity(cert: &Certificate) -> (i64, i64) {
    let not_before = cert
        .tbs_certificate
        .validity
        .not_before
        .to_unix_duration()
        .as_secs() as i64;
    let not_after = cert
        .tbs_certificate
        .validity
        .not_after
        .to_unix_duration()
        .as_secs() as i64;
    (not_before, not_after)
}

/// The subject public key as DER SubjectPublicKeyInfo.
pub fn spki_der(cert: &Certificate) -> Result<DerPublicKey> {
    let der = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| Error::Certificate(format!("failed to encode SPKI: {e}")))?;
    Ok(DerPublicKey::new(der))
}

/// The SAN rfc822Name (email), if any.
pub fn san_email(cert: &Certificate) -> Result<Option<String>> {
    for name in san_names(cert)? {
        if let GeneralName::Rfc822Name(email) = name {
            return Ok(Some(email.to_string()));
        }
    }
    Ok(None)
}

/// The SAN uniformResourceIdentifier, if any.
pub fn san_uri(cert: &Certificate) -> Result<Option<String>> {
    for name in san_names(cert)? {
        if let GeneralName::UniformResourceIdentifier(uri) = name {
            return Ok(Some(uri.to_string()));
        }
    }
    Ok(None)
}

fn san_names(cert: &Certificate) -> Result<Vec<GeneralName>> {
    let san: Option<(bool, SubjectAltName)> = cert
        .tbs_certificate
        .get()
        .map_err(|e| Error::Certificate(format!("failed to read SubjectAltName: {e}")))?;
    Ok(san.map(|(_, san)| san.0).unwrap_or_default())
}

/// The OIDC issuer recorded by Fulcio.
///
/// Prefers the v2 extension (DER UTF8String), falling back to the v1 raw
/// string form.
pub fn oidc_issuer(cert: &Certificate) -> Result<Option<String>> {
    let Some(extensions) = &cert.tbs_certificate.extensions else {
        return Ok(None);
    };

    for ext in extensions {
        if ext.extn_id == FULCIO_ISSUER_V2_OID {
            let value = ext.extn_value.as_bytes();
            let utf8 = der::asn1::Utf8StringRef::from_der(value).map_err(|e| {
                Error::Certificate(format!("malformed issuer extension: {e}"))
            })?;
            return Ok(Some(utf8.to_string()));
        }
    }
    for ext in extensions {
        if ext.extn_id == FULCIO_ISSUER_OID {
            let value = ext.extn_value.as_bytes();
            let issuer = std::str::from_utf8(value)
                .map_err(|e| Error::Certificate(format!("issuer extension is not UTF-8: {e}")))?;
            return Ok(Some(issuer.to_string()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pem_encoding_is_byte_exact() {
        // 100 bytes of DER forces a wrapped base64 body
        let der = vec![0xAB; 100];
        let pem = to_pem_bytes(&der);
        let text = String::from_utf8(pem.clone()).unwrap();

        assert!(text.starts_with("-----BEGIN CERTIFICATE-----\n"));
        assert!(text.ends_with("-----END CERTIFICATE-----\n"));
        assert!(!text.contains('\r'));

        let body: Vec<&str> = text
            .lines()
            .filter(|l| !l.starts_with("-----"))
            .collect();
        for line in &body[..body.len() - 1] {
            assert_eq!(line.len(), 64);
        }
        assert!(body.last().unwrap().len() <= 64);

        let decoded = BASE64.decode(body.concat()).unwrap();
        assert_eq!(decoded, der);
    }

    #[test]
    fn intermediates_skip_leaf_and_root() {
        let a = DerCertificate::new(vec![1]);
        let b = DerCertificate::new(vec![2]);
        let c = DerCertificate::new(vec![3]);

        assert!(intermediates(&[&a]).is_empty());
        assert!(intermediates(&[&a, &b]).is_empty());
        assert_eq!(intermediates(&[&a, &b, &c]), vec![b.clone()]);
    }

    #[test]
    fn leaf_of_empty_path_fails() {
        assert!(leaf(&[]).is_err());
    }
}
