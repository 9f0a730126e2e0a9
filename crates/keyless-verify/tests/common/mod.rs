//! Synthetic verification fixtures.
//!
//! Builds a self-contained keyless world from deterministic P-256 keys: a
//! root CA, a signing leaf with an embedded SCT, a CT log key, and a
//! Rekor log key, plus the trusted root and bundle structures that tie
//! them together. Everything is derived from fixed scalars so tests are
//! reproducible.

#![allow(dead_code)]

use std::str::FromStr;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use der::asn1::{BitString, Ia5String, OctetString, UtcTime};
use der::{Decode, Encode};
use keyless_trust_root::TrustedRoot;
use keyless_types::{
    Bundle, CertificateData, CheckpointEnvelope, DerCertificate, HashAlgorithm, InclusionPromise,
    InclusionProof, KindVersion, LogId, LogIdData, MessageDigest, MessageSignature, RekorEntry,
    Sha256Hash, SignatureBytes, SignatureContent, SignedTimestamp, VerificationMaterial,
    VerificationMaterialContent,
};
use p256::ecdsa::signature::{SignatureEncoding, Signer};
use p256::ecdsa::{DerSignature, SigningKey};
use p256::pkcs8::EncodePublicKey;
use serde_json::json;
use x509_cert::certificate::{Certificate, TbsCertificate, Version};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{BasicConstraints, ExtendedKeyUsage, KeyUsage, KeyUsages, SubjectAltName};
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::time::{Time, Validity};

pub const ARTIFACT: &[u8] = b"hello\n";
pub const LEAF_NOT_BEFORE: i64 = 1_700_000_000;
pub const LEAF_NOT_AFTER: i64 = 1_700_000_600;
pub const INTEGRATED_TIME: i64 = 1_700_000_100;
pub const LOG_INDEX: i64 = 42;
pub const SCT_TIMESTAMP_MS: u64 = 1_700_000_000_500;

pub const SAN_EMAIL: &str = "alice@example.com";
pub const OIDC_ISSUER: &str = "https://accounts.example.com";

pub fn artifact_digest() -> Sha256Hash {
    keyless_crypto::sha256(ARTIFACT)
}

/// All the keys and certificates of the synthetic world.
pub struct TestSetup {
    pub ca_key: SigningKey,
    pub ca_der: Vec<u8>,
    pub ca_spki: Vec<u8>,
    pub leaf_key: SigningKey,
    pub leaf_der: Vec<u8>,
    /// The same leaf minted without an SCT extension.
    pub leaf_no_sct_der: Vec<u8>,
    pub ct_key: SigningKey,
    pub ct_spki: Vec<u8>,
    pub rekor_key: SigningKey,
    pub rekor_spki: Vec<u8>,
}

fn key_from(scalar: u8) -> SigningKey {
    SigningKey::from_slice(&[scalar; 32]).expect("fixed scalar is a valid key")
}

fn spki_of(key: &SigningKey) -> Vec<u8> {
    key.verifying_key()
        .to_public_key_der()
        .expect("SPKI encoding")
        .as_bytes()
        .to_vec()
}

fn ecdsa_sha256() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
        parameters: None,
    }
}

fn der_ext<T: Encode>(oid: const_oid::ObjectIdentifier, critical: bool, value: &T) -> Extension {
    Extension {
        extn_id: oid,
        critical,
        extn_value: OctetString::new(value.to_der().unwrap()).unwrap(),
    }
}

fn raw_ext(oid: const_oid::ObjectIdentifier, bytes: &[u8]) -> Extension {
    Extension {
        extn_id: oid,
        critical: false,
        extn_value: OctetString::new(bytes.to_vec()).unwrap(),
    }
}

fn tbs(
    serial: u8,
    issuer: &Name,
    subject: &Name,
    not_before: i64,
    not_after: i64,
    spki: &[u8],
    extensions: Vec<Extension>,
) -> TbsCertificate {
    TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(&[serial]).unwrap(),
        signature: ecdsa_sha256(),
        issuer: issuer.clone(),
        validity: Validity {
            not_before: Time::UtcTime(
                UtcTime::from_unix_duration(Duration::from_secs(not_before as u64)).unwrap(),
            ),
            not_after: Time::UtcTime(
                UtcTime::from_unix_duration(Duration::from_secs(not_after as u64)).unwrap(),
            ),
        },
        subject: subject.clone(),
        subject_public_key_info: SubjectPublicKeyInfoOwned::from_der(spki).unwrap(),
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: Some(extensions),
    }
}

fn sign_cert(tbs: TbsCertificate, signer: &SigningKey) -> Vec<u8> {
    let tbs_der = tbs.to_der().unwrap();
    let signature: DerSignature = signer.sign(&tbs_der);
    let cert = Certificate {
        tbs_certificate: tbs,
        signature_algorithm: ecdsa_sha256(),
        signature: BitString::from_bytes(&signature.to_vec()).unwrap(),
    };
    cert.to_der().unwrap()
}

/// RFC 6962 §3.2 `digitally-signed` input for an embedded precert SCT.
fn precert_signed_data(timestamp_ms: u64, issuer_key_hash: &[u8; 32], tbs_der: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(0); // sct_version v1
    out.push(0); // signature_type certificate_timestamp
    out.extend(timestamp_ms.to_be_bytes());
    out.extend(1u16.to_be_bytes()); // entry_type precert_entry
    out.extend(issuer_key_hash);
    let len = tbs_der.len() as u32;
    out.extend(&len.to_be_bytes()[1..]); // u24 length
    out.extend(tbs_der);
    out.extend(0u16.to_be_bytes()); // extensions
    out
}

/// Wire form of one serialized SCT.
fn encode_sct(log_id: &[u8; 32], timestamp_ms: u64, sig_der: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(0); // v1
    out.extend(log_id);
    out.extend(timestamp_ms.to_be_bytes());
    out.extend(0u16.to_be_bytes()); // extensions
    out.extend([0x04, 0x03]); // sha256 / ecdsa
    out.extend((sig_der.len() as u16).to_be_bytes());
    out.extend(sig_der);
    out
}

/// The SCT list extension value: an OCTET STRING wrapping the TLS list.
fn sct_list_ext(scts: &[Vec<u8>]) -> Extension {
    let mut entries = Vec::new();
    for sct in scts {
        entries.extend((sct.len() as u16).to_be_bytes());
        entries.extend(sct);
    }
    let mut list = Vec::new();
    list.extend((entries.len() as u16).to_be_bytes());
    list.extend(entries);

    let inner = OctetString::new(list).unwrap();
    Extension {
        extn_id: const_oid::db::rfc6962::CT_PRECERT_SCTS,
        critical: false,
        extn_value: OctetString::new(inner.to_der().unwrap()).unwrap(),
    }
}

impl TestSetup {
    pub fn new() -> Self {
        let ca_key = key_from(0x11);
        let leaf_key = key_from(0x22);
        let ct_key = key_from(0x33);
        let rekor_key = key_from(0x44);

        let ca_spki = spki_of(&ca_key);
        let ct_spki = spki_of(&ct_key);
        let rekor_spki = spki_of(&rekor_key);
        let leaf_spki = spki_of(&leaf_key);

        let ca_name = Name::from_str("CN=fixture-root,O=example").unwrap();
        let leaf_name = Name::from_str("CN=fixture-leaf").unwrap();

        // Self-signed root CA, valid well around the leaf window.
        let ca_tbs = tbs(
            1,
            &ca_name,
            &ca_name,
            LEAF_NOT_BEFORE - 86_400 * 365,
            LEAF_NOT_AFTER + 86_400 * 365,
            &ca_spki,
            vec![
                der_ext(
                    const_oid::db::rfc5280::ID_CE_BASIC_CONSTRAINTS,
                    true,
                    &BasicConstraints {
                        ca: true,
                        path_len_constraint: None,
                    },
                ),
                der_ext(
                    const_oid::db::rfc5280::ID_CE_KEY_USAGE,
                    true,
                    &KeyUsage(KeyUsages::KeyCertSign | KeyUsages::CRLSign),
                ),
            ],
        );
        let ca_der = sign_cert(ca_tbs, &ca_key);

        let leaf_extensions = |with_digital_signature: bool| {
            vec![
                der_ext(
                    const_oid::db::rfc5280::ID_CE_BASIC_CONSTRAINTS,
                    true,
                    &BasicConstraints {
                        ca: false,
                        path_len_constraint: None,
                    },
                ),
                der_ext(
                    const_oid::db::rfc5280::ID_CE_KEY_USAGE,
                    true,
                    &KeyUsage(if with_digital_signature {
                        KeyUsages::DigitalSignature.into()
                    } else {
                        KeyUsages::KeyEncipherment.into()
                    }),
                ),
                der_ext(
                    const_oid::db::rfc5280::ID_CE_EXT_KEY_USAGE,
                    false,
                    &ExtendedKeyUsage(vec![const_oid::db::rfc5912::ID_KP_CODE_SIGNING]),
                ),
                der_ext(
                    const_oid::db::rfc5280::ID_CE_SUBJECT_ALT_NAME,
                    false,
                    &SubjectAltName(vec![GeneralName::Rfc822Name(
                        Ia5String::new(SAN_EMAIL).unwrap(),
                    )]),
                ),
                raw_ext(keyless_crypto::x509::FULCIO_ISSUER_OID, OIDC_ISSUER.as_bytes()),
            ]
        };

        // Two-phase leaf: sign the pre-certificate TBS with the CT key,
        // then mint the final certificate with the SCT list appended.
        let build_leaf = |with_sct: bool| {
            let mut extensions = leaf_extensions(true);
            if with_sct {
                let pre_tbs = tbs(
                    2,
                    &ca_name,
                    &leaf_name,
                    LEAF_NOT_BEFORE,
                    LEAF_NOT_AFTER,
                    &leaf_spki,
                    extensions.clone(),
                );
                let pre_tbs_der = pre_tbs.to_der().unwrap();
                let issuer_key_hash = *keyless_crypto::sha256(&ca_spki).as_bytes();
                let signed = precert_signed_data(SCT_TIMESTAMP_MS, &issuer_key_hash, &pre_tbs_der);
                let sct_sig: DerSignature = ct_key.sign(&signed);
                let log_id = *keyless_crypto::sha256(&ct_spki).as_bytes();
                let sct = encode_sct(&log_id, SCT_TIMESTAMP_MS, &sct_sig.to_vec());
                extensions.push(sct_list_ext(&[sct]));
            }
            let final_tbs = tbs(
                2,
                &ca_name,
                &leaf_name,
                LEAF_NOT_BEFORE,
                LEAF_NOT_AFTER,
                &leaf_spki,
                extensions,
            );
            sign_cert(final_tbs, &ca_key)
        };

        let leaf_der = build_leaf(true);
        let leaf_no_sct_der = build_leaf(false);

        Self {
            ca_key,
            ca_der,
            ca_spki,
            leaf_key,
            leaf_der,
            leaf_no_sct_der,
            ct_key,
            ct_spki,
            rekor_key,
            rekor_spki,
        }
    }

    /// The standard trusted root: one CA, one CT log, one Rekor log, all
    /// active over the fixture's time window.
    pub fn trusted_root(&self) -> TrustedRoot {
        self.trusted_root_with(("2020-01-01T00:00:00Z", None), &self.ct_spki)
    }

    /// Trusted root variant with a custom CA validity window and CT key.
    pub fn trusted_root_with(
        &self,
        ca_valid: (&str, Option<&str>),
        ct_spki: &[u8],
    ) -> TrustedRoot {
        let mut ca_valid_for = json!({ "start": ca_valid.0 });
        if let Some(end) = ca_valid.1 {
            ca_valid_for["end"] = json!(end);
        }
        let root = json!({
            "mediaType": "application/vnd.dev.sigstore.trustedroot+json;version=0.1",
            "certificateAuthorities": [{
                "uri": "https://fulcio.example.com",
                "certChain": { "certificates": [{ "rawBytes": BASE64.encode(&self.ca_der) }] },
                "validFor": ca_valid_for
            }],
            "tlogs": [{
                "baseUrl": "https://rekor.example.com",
                "publicKey": {
                    "rawBytes": BASE64.encode(&self.rekor_spki),
                    "keyDetails": "PKIX_ECDSA_P256_SHA_256",
                    "validFor": { "start": "2020-01-01T00:00:00Z" }
                },
                "logId": {
                    "keyId": BASE64.encode(keyless_crypto::sha256(&self.rekor_spki).as_bytes())
                }
            }],
            "ctlogs": [{
                "publicKey": {
                    "rawBytes": BASE64.encode(ct_spki),
                    "validFor": { "start": "2020-01-01T00:00:00Z" }
                },
                "logId": {
                    "keyId": BASE64.encode(keyless_crypto::sha256(ct_spki).as_bytes())
                }
            }]
        });
        TrustedRoot::from_json(&root.to_string()).unwrap()
    }

    pub fn rekor_log_id(&self) -> LogId {
        LogId::new(
            keyless_crypto::sha256(&self.rekor_spki)
                .as_bytes()
                .to_vec(),
        )
    }

    /// The leaf's detached signature over the fixture artifact.
    pub fn signature(&self) -> SignatureBytes {
        let sig: DerSignature = self.leaf_key.sign(ARTIFACT);
        SignatureBytes::new(sig.to_vec())
    }

    /// The canonical hashed-rekord body for the given signature.
    pub fn body(&self, signature: &SignatureBytes) -> Vec<u8> {
        let pem = keyless_crypto::x509::to_pem_bytes(&self.leaf_der);
        keyless_verify::hashedrekord::canonical_body(&artifact_digest(), &pem, signature)
    }

    /// A Signed Entry Timestamp minted by the fixture's Rekor key.
    pub fn set_for(&self, body: &[u8], integrated_time: i64, log_index: i64) -> SignedTimestamp {
        let payload = json!({
            "body": BASE64.encode(body),
            "integratedTime": integrated_time,
            "logID": self.rekor_log_id().to_hex(),
            "logIndex": log_index,
        });
        let message = serde_json_canonicalizer::to_vec(&payload).unwrap();
        let sig: DerSignature = self.rekor_key.sign(&message);
        SignedTimestamp::new(sig.to_vec())
    }

    pub fn entry(&self, body: Vec<u8>, integrated_time: i64) -> RekorEntry {
        let set = self.set_for(&body, integrated_time, LOG_INDEX);
        RekorEntry {
            log_index: LOG_INDEX,
            log_id: LogIdData {
                key_id: self.rekor_log_id(),
            },
            kind_version: KindVersion {
                kind: "hashedrekord".into(),
                version: "0.0.1".into(),
            },
            integrated_time,
            inclusion_promise: Some(InclusionPromise {
                signed_entry_timestamp: set,
            }),
            inclusion_proof: None,
            canonicalized_body: body.into(),
        }
    }

    /// A single-leaf inclusion proof with a signed checkpoint for `body`.
    pub fn inclusion_proof_for(&self, body: &[u8]) -> InclusionProof {
        let root = keyless_merkle::hash_leaf(body);
        InclusionProof {
            log_index: 0,
            root_hash: Sha256Hash::from_bytes(root),
            tree_size: 1,
            hashes: Vec::new(),
            checkpoint: CheckpointEnvelope {
                envelope: self.checkpoint(1, &root),
            },
        }
    }

    /// A checkpoint note for the given tree head, signed by the Rekor key.
    pub fn checkpoint(&self, tree_size: u64, root: &[u8; 32]) -> String {
        let body = format!(
            "rekor.example.com - 1193050959916656506\n{tree_size}\n{}",
            BASE64.encode(root)
        );
        let signed_text = format!("{body}\n");
        let sig: DerSignature = self.rekor_key.sign(signed_text.as_bytes());
        let hint = keyless_crypto::compute_key_hint(&self.rekor_spki);
        let mut blob = hint.to_vec();
        blob.extend(sig.to_vec());
        format!(
            "{body}\n\n\u{2014} rekor.example.com {}\n",
            BASE64.encode(blob)
        )
    }

    /// Assemble a v0.3 bundle from an entry and signature.
    pub fn bundle(&self, entry: RekorEntry, signature: SignatureBytes) -> Bundle {
        Bundle {
            media_type: "application/vnd.dev.sigstore.bundle.v0.3+json".into(),
            verification_material: VerificationMaterial {
                content: VerificationMaterialContent::Certificate(CertificateData {
                    raw_bytes: DerCertificate::new(self.leaf_der.clone()),
                }),
                tlog_entries: vec![entry],
                timestamp_verification_data: Default::default(),
            },
            content: SignatureContent::MessageSignature(MessageSignature {
                message_digest: Some(MessageDigest {
                    algorithm: HashAlgorithm::Sha2_256,
                    digest: artifact_digest(),
                }),
                signature,
            }),
        }
    }

    /// The standard happy-path bundle.
    pub fn happy_bundle(&self) -> Bundle {
        let signature = self.signature();
        let body = self.body(&signature);
        self.bundle(self.entry(body, INTEGRATED_TIME), signature)
    }
}
