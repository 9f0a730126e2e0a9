//! TUF metadata model.
//!
//! Metadata files are an envelope of `{signatures, signed}`. Signatures
//! cover the canonical JSON form of the `signed` object, so the envelope
//! keeps `signed` as a raw value: it is canonicalized for verification
//! first and only then deserialized into the typed role structs.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use keyless_crypto::{PublicKey, Verifier};
use keyless_types::SignatureBytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

pub const ROOT_ROLE: &str = "root";
pub const TIMESTAMP_ROLE: &str = "timestamp";
pub const SNAPSHOT_ROLE: &str = "snapshot";
pub const TARGETS_ROLE: &str = "targets";

/// A signed metadata file: signatures over the canonical form of `signed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub signatures: Vec<Signature>,
    pub signed: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    pub keyid: String,
    /// Hex-encoded signature bytes.
    pub sig: String,
}

impl Envelope {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// The canonical JSON bytes the signatures cover.
    pub fn signed_bytes(&self) -> Result<Vec<u8>> {
        serde_json_canonicalizer::to_vec(&self.signed)
            .map_err(|e| Error::Canonicalization(e.to_string()))
    }

    /// Deserialize the signed portion into a typed role, checking its
    /// declared `_type`.
    pub fn parse_signed<T: Role + DeserializeOwned>(&self) -> Result<T> {
        let role: T = serde_json::from_value(self.signed.clone())?;
        if role.type_name() != T::ROLE {
            return Err(Error::WrongType {
                expected: T::ROLE,
                actual: role.type_name().to_string(),
            });
        }
        Ok(role)
    }
}

/// Common behavior of the four top-level roles.
pub trait Role {
    const ROLE: &'static str;

    fn type_name(&self) -> &str;
    fn version(&self) -> u64;
    fn expires(&self) -> DateTime<Utc>;

    fn check_expiry(&self, now: DateTime<Utc>) -> Result<()> {
        if self.expires() <= now {
            return Err(Error::Expired {
                role: Self::ROLE,
                expires: self.expires(),
            });
        }
        Ok(())
    }
}

macro_rules! impl_role {
    ($ty:ident, $role:expr) => {
        impl Role for $ty {
            const ROLE: &'static str = $role;

            fn type_name(&self) -> &str {
                &self.type_field
            }

            fn version(&self) -> u64 {
                self.version
            }

            fn expires(&self) -> DateTime<Utc> {
                self.expires
            }
        }
    };
}

/// The root role: the key and threshold registry for all other roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Root {
    #[serde(rename = "_type")]
    pub type_field: String,
    pub spec_version: String,
    pub version: u64,
    pub expires: DateTime<Utc>,
    #[serde(default)]
    pub consistent_snapshot: bool,
    pub keys: BTreeMap<String, Key>,
    pub roles: BTreeMap<String, RoleKeys>,
}

impl_role!(Root, ROOT_ROLE);

impl Root {
    pub fn role(&self, name: &'static str) -> Result<&RoleKeys> {
        self.roles.get(name).ok_or(Error::RoleNotFound(name))
    }

    /// Verify an envelope against one of this root's roles.
    ///
    /// Counts distinct authorized keyids whose signature verifies over the
    /// envelope's canonical bytes; anything below the role threshold is
    /// fatal. Unknown keyids and malformed signatures simply do not count.
    pub fn verify_role(&self, role_name: &'static str, envelope: &Envelope) -> Result<()> {
        let role = self.role(role_name)?;
        let signed = envelope.signed_bytes()?;

        let mut verified: HashSet<&str> = HashSet::new();
        for signature in &envelope.signatures {
            if !role.keyids.iter().any(|id| id == &signature.keyid) {
                continue;
            }
            if verified.contains(signature.keyid.as_str()) {
                continue;
            }
            let Some(key) = self.keys.get(&signature.keyid) else {
                continue;
            };
            let Ok(public_key) = key.decode() else {
                continue;
            };
            let Ok(sig_bytes) = hex::decode(&signature.sig) else {
                continue;
            };
            let sig = SignatureBytes::new(sig_bytes);
            match Verifier::new(&public_key).and_then(|v| v.verify(&signed, &sig)) {
                Ok(()) => {
                    verified.insert(&signature.keyid);
                }
                Err(_) => {
                    tracing::debug!(role = role_name, keyid = %signature.keyid, "signature did not verify");
                }
            }
        }

        if (verified.len() as u32) < role.threshold {
            return Err(Error::ThresholdUnmet {
                role: role_name,
                verified: verified.len(),
                threshold: role.threshold,
            });
        }
        Ok(())
    }
}

/// A verification key as published in root metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Key {
    pub keytype: String,
    pub scheme: String,
    pub keyval: KeyValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyValue {
    pub public: String,
}

impl Key {
    /// Decode the published key material.
    ///
    /// The public value is either a PEM block or hex-encoded raw material
    /// (an uncompressed EC point or a raw Ed25519 key) depending on the
    /// repository's vintage.
    pub fn decode(&self) -> Result<PublicKey> {
        let public = self.keyval.public.trim();
        if public.starts_with("-----BEGIN") {
            return Ok(PublicKey::from_tuf(public.as_bytes(), &self.scheme)?);
        }
        match hex::decode(public) {
            Ok(raw) => Ok(PublicKey::from_tuf(&raw, &self.scheme)?),
            Err(_) => Ok(PublicKey::from_tuf(public.as_bytes(), &self.scheme)?),
        }
    }
}

/// Keyids and threshold for one role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleKeys {
    pub keyids: Vec<String>,
    pub threshold: u32,
}

/// The timestamp role: points at the current snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timestamp {
    #[serde(rename = "_type")]
    pub type_field: String,
    pub spec_version: String,
    pub version: u64,
    pub expires: DateTime<Utc>,
    pub meta: BTreeMap<String, MetaFile>,
}

impl_role!(Timestamp, TIMESTAMP_ROLE);

impl Timestamp {
    pub fn snapshot_meta(&self) -> Result<&MetaFile> {
        self.meta
            .get("snapshot.json")
            .ok_or_else(|| Error::TargetNotFound("snapshot.json meta entry".into()))
    }
}

/// The snapshot role: pins the version of every targets file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "_type")]
    pub type_field: String,
    pub spec_version: String,
    pub version: u64,
    pub expires: DateTime<Utc>,
    pub meta: BTreeMap<String, MetaFile>,
}

impl_role!(Snapshot, SNAPSHOT_ROLE);

impl Snapshot {
    pub fn targets_meta(&self) -> Result<&MetaFile> {
        self.meta
            .get("targets.json")
            .ok_or_else(|| Error::TargetNotFound("targets.json meta entry".into()))
    }
}

/// A metadata file descriptor inside timestamp/snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashes: Option<BTreeMap<String, String>>,
}

impl MetaFile {
    /// Check a downloaded metadata file against the declared length and
    /// hashes, when present.
    pub fn check(&self, name: &str, bytes: &[u8]) -> Result<()> {
        check_length_and_hashes(name, bytes, self.length, self.hashes.as_ref())
    }
}

/// The targets role: the downloadable target registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Targets {
    #[serde(rename = "_type")]
    pub type_field: String,
    pub spec_version: String,
    pub version: u64,
    pub expires: DateTime<Utc>,
    pub targets: BTreeMap<String, TargetMeta>,
}

impl_role!(Targets, TARGETS_ROLE);

/// A target file descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetMeta {
    pub length: u64,
    pub hashes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<serde_json::Value>,
}

impl TargetMeta {
    /// The hex SHA-256 of the target, used for consistent-snapshot paths.
    pub fn sha256(&self) -> Result<&str> {
        self.hashes
            .get("sha256")
            .map(String::as_str)
            .ok_or_else(|| Error::HashMismatch("target lists no sha256 hash".into()))
    }

    pub fn check(&self, name: &str, bytes: &[u8]) -> Result<()> {
        check_length_and_hashes(name, bytes, Some(self.length), Some(&self.hashes))
    }
}

fn check_length_and_hashes(
    name: &str,
    bytes: &[u8],
    length: Option<u64>,
    hashes: Option<&BTreeMap<String, String>>,
) -> Result<()> {
    if let Some(expected) = length {
        if bytes.len() as u64 != expected {
            return Err(Error::LengthMismatch {
                name: name.to_string(),
                expected,
                actual: bytes.len() as u64,
            });
        }
    }
    if let Some(hashes) = hashes {
        if let Some(expected) = hashes.get("sha256") {
            let actual = keyless_crypto::sha256(bytes).to_hex();
            if &actual != expected {
                return Err(Error::HashMismatch(name.to_string()));
            }
        }
    }
    Ok(())
}
