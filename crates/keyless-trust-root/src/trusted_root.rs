//! The in-memory trusted root model.
//!
//! Parses the `dev.sigstore.trustroot.v1.TrustedRoot` JSON schema and
//! offers the lookups verification needs: the CAs active at a point in
//! time, and log keys by log ID. `validate()` enforces the structural
//! invariants (well-formed validity intervals, log IDs that really are
//! the SHA-256 of their key) so later lookups can rely on them.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use keyless_types::{DerCertificate, DerPublicKey, LogId};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustedRoot {
    pub media_type: String,

    /// Rekor transparency logs.
    #[serde(default)]
    pub tlogs: Vec<LogInstance>,

    /// Fulcio certificate authorities.
    #[serde(default)]
    pub certificate_authorities: Vec<CertificateAuthority>,

    /// Certificate Transparency logs.
    #[serde(default)]
    pub ctlogs: Vec<LogInstance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogInstance {
    #[serde(default)]
    pub base_url: Option<String>,
    pub public_key: LogPublicKey,
    pub log_id: LogIdEntry,
}

impl LogInstance {
    pub fn log_id(&self) -> &LogId {
        &self.log_id.key_id
    }

    /// Whether the log key's validity interval covers `time`.
    pub fn valid_at(&self, time: i64) -> bool {
        self.public_key
            .valid_for
            .as_ref()
            .map(|v| v.contains(time))
            .unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPublicKey {
    /// DER SubjectPublicKeyInfo.
    pub raw_bytes: DerPublicKey,
    #[serde(default)]
    pub key_details: Option<String>,
    #[serde(default)]
    pub valid_for: Option<ValidityPeriod>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogIdEntry {
    pub key_id: LogId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateAuthority {
    #[serde(default)]
    pub uri: Option<String>,
    pub cert_chain: CertChain,
    #[serde(default)]
    pub valid_for: Option<ValidityPeriod>,
}

impl CertificateAuthority {
    /// The CA chain, leaf-to-root order as published.
    pub fn certificates(&self) -> impl Iterator<Item = &DerCertificate> {
        self.cert_chain.certificates.iter().map(|c| &c.raw_bytes)
    }

    pub fn valid_at(&self, time: i64) -> bool {
        self.valid_for
            .as_ref()
            .map(|v| v.contains(time))
            .unwrap_or(true)
    }

    /// The interval start, as a Unix timestamp, for tie-breaking between
    /// concurrently valid CAs.
    pub fn start_time(&self) -> i64 {
        self.valid_for
            .as_ref()
            .and_then(|v| v.start)
            .map(|t| t.timestamp())
            .unwrap_or(i64::MIN)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertChain {
    pub certificates: Vec<CertEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertEntry {
    pub raw_bytes: DerCertificate,
}

/// A half-bounded or closed validity interval. The end bound, when
/// present, is inclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidityPeriod {
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

impl ValidityPeriod {
    pub fn contains(&self, time: i64) -> bool {
        let after_start = self.start.map_or(true, |s| s.timestamp() <= time);
        let before_end = self.end.map_or(true, |e| time <= e.timestamp());
        after_start && before_end
    }
}

impl TrustedRoot {
    pub fn from_json(json: &str) -> Result<Self> {
        let root: TrustedRoot = serde_json::from_str(json)?;
        root.validate()?;
        Ok(root)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Structural invariants: every validity interval is well-formed, and
    /// every log ID equals the SHA-256 of its key's DER SPKI.
    pub fn validate(&self) -> Result<()> {
        for ca in &self.certificate_authorities {
            if ca.cert_chain.certificates.is_empty() {
                return Err(Error::Invalid(
                    "certificate authority has an empty chain".into(),
                ));
            }
            check_interval(ca.valid_for.as_ref(), "certificate authority")?;
        }
        for (kind, logs) in [("tlog", &self.tlogs), ("ctlog", &self.ctlogs)] {
            for log in logs {
                check_interval(log.public_key.valid_for.as_ref(), kind)?;
                let computed = keyless_crypto::sha256(log.public_key.raw_bytes.as_bytes());
                if log.log_id().as_bytes() != computed.as_bytes() {
                    return Err(Error::Invalid(format!(
                        "{kind} log ID {} is not the SHA-256 of its public key",
                        log.log_id().to_hex()
                    )));
                }
            }
        }
        Ok(())
    }

    /// The CAs whose validity interval covers `time`, most recently
    /// started first. Path building tries them in this order and never
    /// silently mixes anchors.
    pub fn cas_valid_at(&self, time: i64) -> Vec<&CertificateAuthority> {
        let mut cas: Vec<&CertificateAuthority> = self
            .certificate_authorities
            .iter()
            .filter(|ca| ca.valid_at(time))
            .collect();
        cas.sort_by_key(|ca| std::cmp::Reverse(ca.start_time()));
        cas
    }

    /// Look up a Rekor log key by log ID. Validity is the caller's check,
    /// against the instant that matters to it.
    pub fn tlog_by_id(&self, id: &LogId) -> Option<&LogInstance> {
        self.tlogs.iter().find(|log| log.log_id() == id)
    }

    /// Look up a CT log key by log ID.
    pub fn ctlog_by_id(&self, id: &LogId) -> Option<&LogInstance> {
        self.ctlogs.iter().find(|log| log.log_id() == id)
    }
}

fn check_interval(interval: Option<&ValidityPeriod>, what: &str) -> Result<()> {
    let Some(interval) = interval else {
        return Ok(());
    };
    if interval.start.is_none() {
        return Err(Error::Invalid(format!(
            "{what} validity interval is missing its start"
        )));
    }
    if let (Some(start), Some(end)) = (interval.start, interval.end) {
        if end < start {
            return Err(Error::Invalid(format!(
                "{what} validity interval ends before it starts"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde_json::json;

    const SPKI_B64: &str = "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEYI4heOTrNrZO27elFE8ynfrdPMikttRkbe+vJKQ50G6bfwQ3WyhLpRwwwohelDAm8xRzJ56nYsIa3VHivVvpmA==";

    fn log_id_for(spki_b64: &str) -> String {
        let der = BASE64.decode(spki_b64).unwrap();
        BASE64.encode(keyless_crypto::sha256(&der).as_bytes())
    }

    fn sample_root() -> String {
        json!({
            "mediaType": "application/vnd.dev.sigstore.trustedroot+json;version=0.1",
            "tlogs": [{
                "baseUrl": "https://rekor.sigstore.dev",
                "publicKey": {
                    "rawBytes": SPKI_B64,
                    "keyDetails": "PKIX_ECDSA_P256_SHA_256",
                    "validFor": { "start": "2021-01-12T00:00:00Z" }
                },
                "logId": { "keyId": log_id_for(SPKI_B64) }
            }],
            "certificateAuthorities": [
                {
                    "uri": "https://fulcio.sigstore.dev",
                    "certChain": { "certificates": [{ "rawBytes": "AQID" }] },
                    "validFor": {
                        "start": "2021-03-07T00:00:00Z",
                        "end": "2022-12-31T00:00:00Z"
                    }
                },
                {
                    "uri": "https://fulcio.sigstore.dev",
                    "certChain": { "certificates": [{ "rawBytes": "BAUG" }] },
                    "validFor": { "start": "2022-04-13T00:00:00Z" }
                }
            ],
            "ctlogs": [{
                "publicKey": {
                    "rawBytes": SPKI_B64,
                    "validFor": { "start": "2021-03-14T00:00:00Z" }
                },
                "logId": { "keyId": log_id_for(SPKI_B64) }
            }]
        })
        .to_string()
    }

    #[test]
    fn parses_and_validates() {
        let root = TrustedRoot::from_json(&sample_root()).unwrap();
        assert_eq!(root.tlogs.len(), 1);
        assert_eq!(root.certificate_authorities.len(), 2);
        assert_eq!(root.ctlogs.len(), 1);
    }

    #[test]
    fn rejects_forged_log_id() {
        let mut json: serde_json::Value = serde_json::from_str(&sample_root()).unwrap();
        json["tlogs"][0]["logId"]["keyId"] = serde_json::Value::String(BASE64.encode([0u8; 32]));
        assert!(matches!(
            TrustedRoot::from_json(&json.to_string()),
            Err(Error::Invalid(_))
        ));
    }

    #[test]
    fn rejects_inverted_interval() {
        let mut json: serde_json::Value = serde_json::from_str(&sample_root()).unwrap();
        json["certificateAuthorities"][0]["validFor"] = json!({
            "start": "2023-01-01T00:00:00Z",
            "end": "2022-01-01T00:00:00Z"
        });
        assert!(matches!(
            TrustedRoot::from_json(&json.to_string()),
            Err(Error::Invalid(_))
        ));
    }

    #[test]
    fn ca_lookup_orders_by_latest_start() {
        let root = TrustedRoot::from_json(&sample_root()).unwrap();

        // mid-2022: both CAs are active, the 2022 one must come first
        let mid_2022 = chrono::DateTime::parse_from_rfc3339("2022-06-01T00:00:00Z")
            .unwrap()
            .timestamp();
        let cas = root.cas_valid_at(mid_2022);
        assert_eq!(cas.len(), 2);
        assert_eq!(cas[0].certificates().next().unwrap().as_bytes(), &[4, 5, 6]);

        // 2024: the bounded CA has lapsed
        let in_2024 = chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .timestamp();
        let cas = root.cas_valid_at(in_2024);
        assert_eq!(cas.len(), 1);

        // before either start
        let in_2020 = chrono::DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z")
            .unwrap()
            .timestamp();
        assert!(root.cas_valid_at(in_2020).is_empty());
    }

    #[test]
    fn log_lookup_respects_validity() {
        let root = TrustedRoot::from_json(&sample_root()).unwrap();
        let id = root.tlogs[0].log_id().clone();

        let log = root.tlog_by_id(&id).unwrap();
        let in_2022 = chrono::DateTime::parse_from_rfc3339("2022-01-01T00:00:00Z")
            .unwrap()
            .timestamp();
        assert!(log.valid_at(in_2022));
        let in_2020 = chrono::DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z")
            .unwrap()
            .timestamp();
        assert!(!log.valid_at(in_2020));

        let unknown = LogId::new(vec![9; 32]);
        assert!(root.tlog_by_id(&unknown).is_none());
        assert!(root.ctlog_by_id(&id).is_some());
    }
}
