//! The Sigstore bundle: the self-contained verification input.
//!
//! A bundle binds a signature, the signing certificate (or chain), and the
//! transparency log entries that witnessed the signing event. This module
//! models the protobuf JSON encoding across media type versions 0.1 to 0.3.

use crate::dsse::DsseEnvelope;
use crate::encoding::{
    string_i64, CanonicalizedBody, DerCertificate, LogId, Sha256Hash, SignatureBytes,
    SignedTimestamp, TimestampToken,
};
use crate::error::{Error, Result};
use crate::hash::HashAlgorithm;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Recognized bundle media types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    V0_1,
    V0_2,
    V0_3,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::V0_1 => "application/vnd.dev.sigstore.bundle+json;version=0.1",
            MediaType::V0_2 => "application/vnd.dev.sigstore.bundle+json;version=0.2",
            MediaType::V0_3 => "application/vnd.dev.sigstore.bundle.v0.3+json",
        }
    }
}

impl FromStr for MediaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "application/vnd.dev.sigstore.bundle+json;version=0.1" => Ok(MediaType::V0_1),
            "application/vnd.dev.sigstore.bundle+json;version=0.2" => Ok(MediaType::V0_2),
            "application/vnd.dev.sigstore.bundle.v0.3+json"
            | "application/vnd.dev.sigstore.bundle+json;version=0.3" => Ok(MediaType::V0_3),
            other => Err(Error::UnknownMediaType(other.to_string())),
        }
    }
}

/// The verification input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub media_type: String,
    pub verification_material: VerificationMaterial,
    #[serde(flatten)]
    pub content: SignatureContent,
}

impl Bundle {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn media_type(&self) -> Result<MediaType> {
        self.media_type.parse()
    }

    /// The ordered certificate path, leaf first. Empty when the bundle
    /// carries only a public key hint.
    pub fn cert_path(&self) -> Vec<&DerCertificate> {
        match &self.verification_material.content {
            VerificationMaterialContent::Certificate(cert) => vec![&cert.raw_bytes],
            VerificationMaterialContent::X509CertificateChain { certificates } => {
                certificates.iter().map(|c| &c.raw_bytes).collect()
            }
            VerificationMaterialContent::PublicKey { .. } => Vec::new(),
        }
    }

    /// The detached message signature, if this is not a DSSE bundle.
    pub fn message_signature(&self) -> Option<&MessageSignature> {
        match &self.content {
            SignatureContent::MessageSignature(ms) => Some(ms),
            SignatureContent::DsseEnvelope(_) => None,
        }
    }

    pub fn entries(&self) -> &[RekorEntry] {
        &self.verification_material.tlog_entries
    }

    pub fn timestamps(&self) -> &[Rfc3161Timestamp] {
        &self
            .verification_material
            .timestamp_verification_data
            .rfc3161_timestamps
    }
}

/// Either a detached signature over the artifact or a DSSE envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignatureContent {
    MessageSignature(MessageSignature),
    DsseEnvelope(DsseEnvelope),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSignature {
    /// Digest of the signed artifact. Optional: bundles produced from a
    /// digest-only signing flow always carry it, older producers may not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_digest: Option<MessageDigest>,
    pub signature: SignatureBytes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDigest {
    pub algorithm: HashAlgorithm,
    pub digest: Sha256Hash,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMaterial {
    #[serde(flatten)]
    pub content: VerificationMaterialContent,
    #[serde(default)]
    pub tlog_entries: Vec<RekorEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp_verification_data: TimestampVerificationData,
}

/// The key material carried by the bundle. The JSON field name selects the
/// variant: `certificate` (v0.3), `x509CertificateChain` (v0.1/v0.2), or
/// `publicKey`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerificationMaterialContent {
    Certificate(CertificateData),
    X509CertificateChain { certificates: Vec<CertificateData> },
    PublicKey { hint: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateData {
    pub raw_bytes: DerCertificate,
}

/// One Rekor transparency log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RekorEntry {
    #[serde(with = "string_i64")]
    pub log_index: i64,
    pub log_id: LogIdData,
    pub kind_version: KindVersion,
    /// Seconds since the Unix epoch at which the log integrated the entry.
    #[serde(default, with = "string_i64")]
    pub integrated_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inclusion_promise: Option<InclusionPromise>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inclusion_proof: Option<InclusionProof>,
    pub canonicalized_body: CanonicalizedBody,
}

impl RekorEntry {
    pub fn log_id(&self) -> &LogId {
        &self.log_id.key_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogIdData {
    pub key_id: LogId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindVersion {
    pub kind: String,
    pub version: String,
}

/// The Signed Entry Timestamp: the log's promise that the entry is (or will
/// be) included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionPromise {
    pub signed_entry_timestamp: SignedTimestamp,
}

/// A Merkle audit path from the entry's leaf to a signed tree head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionProof {
    #[serde(with = "string_i64")]
    pub log_index: i64,
    pub root_hash: Sha256Hash,
    #[serde(with = "string_i64")]
    pub tree_size: i64,
    pub hashes: Vec<Sha256Hash>,
    #[serde(default, skip_serializing_if = "CheckpointEnvelope::is_empty")]
    pub checkpoint: CheckpointEnvelope,
}

/// The signed-note text of a log checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointEnvelope {
    #[serde(default)]
    pub envelope: String,
}

impl CheckpointEnvelope {
    pub fn is_empty(&self) -> bool {
        self.envelope.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimestampVerificationData {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rfc3161_timestamps: Vec<Rfc3161Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rfc3161Timestamp {
    pub signed_timestamp: TimestampToken,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

impl<'de> Deserialize<'de> for Bundle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Helper {
            // cosign V1 bundles omit the media type; treat them as v0.1
            #[serde(default = "v0_1_media_type")]
            media_type: String,
            verification_material: VerificationMaterial,
            #[serde(flatten)]
            content: SignatureContent,
        }

        let helper = Helper::deserialize(deserializer)?;
        Ok(Bundle {
            media_type: helper.media_type,
            verification_material: helper.verification_material,
            content: helper.content,
        })
    }
}

fn v0_1_media_type() -> String {
    MediaType::V0_1.as_str().to_string()
}
