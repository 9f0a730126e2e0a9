//! Rekor log entry verification.
//!
//! An entry is authentic when its Signed Entry Timestamp verifies under a
//! trusted log key that was valid at the integrated time. An inclusion
//! proof, when present, is additionally checked against its Merkle path
//! and (when present) the signed checkpoint.

use keyless_crypto::{verifier, PublicKey, SignedNote};
use keyless_merkle::{hash_leaf, verify_inclusion, HASH_SIZE};
use keyless_trust_root::{LogInstance, TrustedRoot};
use keyless_types::{InclusionProof, RekorEntry, SignatureBytes};
use serde::Serialize;

use crate::error::RekorError;

type Result<T> = std::result::Result<T, RekorError>;

/// Verifies transparency log entries against the trusted root's log keys.
pub struct RekorVerifier {
    trusted_root: TrustedRoot,
}

/// The canonical SET payload. serde_json_canonicalizer sorts the keys, so
/// only the wire names matter here.
#[derive(Serialize)]
struct SetPayload<'a> {
    body: &'a str,
    #[serde(rename = "integratedTime")]
    integrated_time: i64,
    #[serde(rename = "logIndex")]
    log_index: i64,
    #[serde(rename = "logID")]
    log_id: String,
}

impl RekorVerifier {
    pub fn new(trusted_root: &TrustedRoot) -> Self {
        Self {
            trusted_root: trusted_root.clone(),
        }
    }

    /// Verify one log entry.
    pub fn verify_entry(&self, entry: &RekorEntry, require_inclusion_proof: bool) -> Result<()> {
        let log = self
            .trusted_root
            .tlog_by_id(entry.log_id())
            .ok_or_else(|| RekorError::UntrustedLog(entry.log_id().to_hex()))?;
        if !log.valid_at(entry.integrated_time) {
            return Err(RekorError::LogKeyExpired(entry.integrated_time));
        }

        self.verify_set(entry, log)?;

        match &entry.inclusion_proof {
            Some(proof) => self.verify_inclusion_proof(entry, proof)?,
            None if require_inclusion_proof => {
                return Err(RekorError::BadInclusionProof(
                    "entry carries no inclusion proof".into(),
                ));
            }
            // A verified SET is the log's own promise of inclusion.
            None => {}
        }

        Ok(())
    }

    /// Verify the Signed Entry Timestamp over the canonical
    /// `{body, integratedTime, logID, logIndex}` payload.
    fn verify_set(&self, entry: &RekorEntry, log: &LogInstance) -> Result<()> {
        let promise = entry
            .inclusion_promise
            .as_ref()
            .ok_or_else(|| RekorError::BadSet("entry has no signed entry timestamp".into()))?;

        let body = entry.canonicalized_body.to_base64();
        let payload = SetPayload {
            body: &body,
            integrated_time: entry.integrated_time,
            log_index: entry.log_index,
            log_id: entry.log_id().to_hex(),
        };
        let message = serde_json_canonicalizer::to_vec(&payload)
            .map_err(|e| RekorError::BadSet(format!("canonicalization failed: {e}")))?;

        let key = PublicKey::from_spki_der(log.public_key.raw_bytes.as_bytes())
            .map_err(|e| RekorError::BadSet(format!("bad log key: {e}")))?;
        let signature = SignatureBytes::new(promise.signed_entry_timestamp.as_bytes().to_vec());
        verifier::verify_signature(&key, &message, &signature)
            .map_err(|e| RekorError::BadSet(e.to_string()))
    }

    /// Recompute the Merkle root from the entry body and compare it to the
    /// proof's root; verify the checkpoint when one is attached.
    fn verify_inclusion_proof(&self, entry: &RekorEntry, proof: &InclusionProof) -> Result<()> {
        let leaf = hash_leaf(entry.canonicalized_body.as_bytes());

        let hashes: Vec<[u8; HASH_SIZE]> = proof.hashes.iter().map(|h| *h.as_bytes()).collect();
        if proof.log_index < 0 || proof.tree_size <= 0 {
            return Err(RekorError::BadInclusionProof(
                "proof indices must be non-negative".into(),
            ));
        }
        verify_inclusion(
            &leaf,
            proof.log_index as u64,
            proof.tree_size as u64,
            &hashes,
            proof.root_hash.as_bytes(),
        )
        .map_err(|e| RekorError::BadInclusionProof(e.to_string()))?;

        if !proof.checkpoint.is_empty() {
            self.verify_checkpoint(entry, proof)?;
        }
        Ok(())
    }

    /// The checkpoint must agree with the proof's tree head and carry a
    /// signature from a trusted log key, matched by 4-byte key hint.
    fn verify_checkpoint(&self, entry: &RekorEntry, proof: &InclusionProof) -> Result<()> {
        let note = SignedNote::from_text(&proof.checkpoint.envelope)
            .map_err(|e| RekorError::BadCheckpoint(e.to_string()))?;

        if note.tree_size != proof.tree_size as u64 {
            return Err(RekorError::BadCheckpoint(format!(
                "checkpoint tree size {} does not match proof tree size {}",
                note.tree_size, proof.tree_size
            )));
        }
        if note.root_hash != proof.root_hash {
            return Err(RekorError::BadCheckpoint(
                "checkpoint root hash does not match proof root hash".into(),
            ));
        }

        // Prefer the key that verified the SET, but accept any trusted log
        // key whose hint matches a signature on the note.
        let candidates = std::iter::once(entry.log_id())
            .chain(self.trusted_root.tlogs.iter().map(|l| l.log_id()));
        for log_id in candidates {
            let Some(log) = self.trusted_root.tlog_by_id(log_id) else {
                continue;
            };
            let hint = keyless_crypto::compute_key_hint(log.public_key.raw_bytes.as_bytes());
            let Some(signature) = note.signature_for_hint(&hint) else {
                continue;
            };
            let key = PublicKey::from_spki_der(log.public_key.raw_bytes.as_bytes())
                .map_err(|e| RekorError::BadCheckpoint(format!("bad log key: {e}")))?;
            let sig = SignatureBytes::new(signature.signature.clone());
            return verifier::verify_signature(&key, note.signed_bytes(), &sig)
                .map_err(|e| RekorError::BadCheckpoint(e.to_string()));
        }

        Err(RekorError::BadCheckpoint(
            "no trusted log key matches a checkpoint signature".into(),
        ))
    }
}
