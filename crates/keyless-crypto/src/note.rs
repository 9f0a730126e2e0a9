//! Signed-note parsing for Rekor checkpoints.
//!
//! Checkpoints are distributed in the golang.org/x/mod/sumdb/note format:
//! a text body (origin, tree size, root hash, optional metadata), a blank
//! line, then one signature line per signer. Signature lines start with an
//! em dash (U+2014) and carry `base64(key_id[4] || signature)`.

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use keyless_types::Sha256Hash;
use sha2::{Digest, Sha256};

/// A parsed signature line.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSignature {
    /// Signer name, e.g. `rekor.sigstore.dev`.
    pub name: String,
    /// First four bytes of SHA-256 over the signer's key, used to match
    /// signatures to trusted keys.
    pub key_hint: [u8; 4],
    pub signature: Vec<u8>,
}

impl NoteSignature {
    fn from_line(line: &str) -> Result<Self> {
        let rest = line.strip_prefix('\u{2014}').ok_or_else(|| {
            Error::Checkpoint("signature line must start with an em dash".into())
        })?;
        let mut parts = rest.split_whitespace();
        let name = parts
            .next()
            .ok_or_else(|| Error::Checkpoint("signature line is missing the signer name".into()))?;
        let encoded = parts
            .next()
            .ok_or_else(|| Error::Checkpoint("signature line is missing the signature".into()))?;

        let decoded = BASE64
            .decode(encoded)
            .map_err(|e| Error::Checkpoint(format!("invalid signature base64: {e}")))?;
        if decoded.len() < 5 {
            return Err(Error::Checkpoint(
                "signature must carry a 4-byte key hint plus signature bytes".into(),
            ));
        }
        let key_hint: [u8; 4] = decoded[..4].try_into().expect("length checked above");

        Ok(NoteSignature {
            name: name.to_string(),
            key_hint,
            signature: decoded[4..].to_vec(),
        })
    }
}

/// A parsed checkpoint note.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedNote {
    pub origin: String,
    pub tree_size: u64,
    pub root_hash: Sha256Hash,
    /// Trailing body lines, e.g. a timestamp.
    pub metadata: Vec<String>,
    /// The exact body text covered by the signatures, trailing newline
    /// included.
    pub signed_text: String,
    pub signatures: Vec<NoteSignature>,
}

impl SignedNote {
    /// Parse a note from its text form.
    pub fn from_text(text: &str) -> Result<Self> {
        let (body, signature_block) = text
            .split_once("\n\n")
            .ok_or_else(|| Error::Checkpoint("note is missing the blank-line separator".into()))?;
        if signature_block.contains("\n\n") {
            return Err(Error::Checkpoint("note has multiple blank-line separators".into()));
        }

        let mut lines = body.lines();
        let origin = lines
            .next()
            .filter(|l| !l.is_empty())
            .ok_or_else(|| Error::Checkpoint("note is missing the origin line".into()))?;
        let tree_size = lines
            .next()
            .ok_or_else(|| Error::Checkpoint("note is missing the tree size".into()))?
            .trim()
            .parse::<u64>()
            .map_err(|_| Error::Checkpoint("tree size is not an integer".into()))?;
        let root_line = lines
            .next()
            .ok_or_else(|| Error::Checkpoint("note is missing the root hash".into()))?;
        let root_bytes = BASE64
            .decode(root_line.trim())
            .map_err(|e| Error::Checkpoint(format!("invalid root hash base64: {e}")))?;
        let root_hash = Sha256Hash::try_from_slice(&root_bytes)
            .map_err(|e| Error::Checkpoint(format!("bad root hash: {e}")))?;
        let metadata = lines.map(|l| l.to_string()).collect();

        let mut signatures = Vec::new();
        for line in signature_block.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            signatures.push(NoteSignature::from_line(line)?);
        }
        if signatures.is_empty() {
            return Err(Error::Checkpoint("note has no signatures".into()));
        }

        Ok(SignedNote {
            origin: origin.to_string(),
            tree_size,
            root_hash,
            metadata,
            signed_text: format!("{body}\n"),
            signatures,
        })
    }

    /// The bytes the signatures cover.
    pub fn signed_bytes(&self) -> &[u8] {
        self.signed_text.as_bytes()
    }

    pub fn signature_for_hint(&self, hint: &[u8; 4]) -> Option<&NoteSignature> {
        self.signatures.iter().find(|sig| &sig.key_hint == hint)
    }
}

/// The 4-byte hint identifying a log key: the leading bytes of SHA-256
/// over its DER SubjectPublicKeyInfo.
pub fn compute_key_hint(spki_der: &[u8]) -> [u8; 4] {
    let digest = Sha256::digest(spki_der);
    [digest[0], digest[1], digest[2], digest[3]]
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTE: &str = "rekor.sigstore.dev - 2605736670972794746\n23083062\ndauhleYK4YyAdxwwDtR0l0KnSOWZdG2bwqHftlanvcI=\nTimestamp: 1689177396617352539\n\n\u{2014} rekor.sigstore.dev xNI9ajBFAiBxaGyEtxkzFLkaCSEJqFuSS3dJjEZCNiyByVs1CNVQ8gIhAOoNnXtmMtTctV2oRnSRUZAo4EWUYPK/vBsqOzAU6TMs";

    #[test]
    fn parses_rekor_checkpoint() {
        let note = SignedNote::from_text(NOTE).unwrap();
        assert_eq!(note.origin, "rekor.sigstore.dev - 2605736670972794746");
        assert_eq!(note.tree_size, 23083062);
        assert_eq!(note.metadata, vec!["Timestamp: 1689177396617352539"]);
        assert_eq!(note.signatures.len(), 1);
        assert_eq!(note.signatures[0].name, "rekor.sigstore.dev");
    }

    #[test]
    fn signed_text_includes_trailing_newline() {
        let note = SignedNote::from_text(NOTE).unwrap();
        assert!(note.signed_text.ends_with("Timestamp: 1689177396617352539\n"));
    }

    #[test]
    fn rejects_missing_separator() {
        assert!(SignedNote::from_text("origin\n1\nAAAA\n").is_err());
    }

    #[test]
    fn rejects_ascii_hyphen_signature_line() {
        let bad = NOTE.replace('\u{2014}', "-");
        assert!(SignedNote::from_text(&bad).is_err());
    }

    #[test]
    fn key_hint_is_leading_hash_bytes() {
        let hint = compute_key_hint(b"some key material");
        let full = Sha256::digest(b"some key material");
        assert_eq!(&hint, &full[..4]);
    }
}
