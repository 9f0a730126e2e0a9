//! Canonical hashed-rekord body construction.
//!
//! Rekor canonicalizes hashedrekord proposals into a fixed JSON form:
//! keys in lexicographic order, no insignificant whitespace, hex digest,
//! base64 signature, and a base64 PEM certificate. Reconstructing that
//! form byte-for-byte is what binds a log entry to the artifact,
//! certificate, and signature a bundle presents.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use keyless_types::{Sha256Hash, SignatureBytes};
use serde::Serialize;

// Field order in these structs is the serialization order, and it must
// stay lexicographic to match Rekor's canonical output.

#[derive(Serialize)]
struct Proposal<'a> {
    #[serde(rename = "apiVersion")]
    api_version: &'static str,
    kind: &'static str,
    spec: Spec<'a>,
}

#[derive(Serialize)]
struct Spec<'a> {
    data: Data,
    signature: Signature<'a>,
}

#[derive(Serialize)]
struct Data {
    hash: Hash,
}

#[derive(Serialize)]
struct Hash {
    algorithm: &'static str,
    value: String,
}

#[derive(Serialize)]
struct Signature<'a> {
    content: String,
    #[serde(rename = "publicKey")]
    public_key: PublicKeyContent<'a>,
}

#[derive(Serialize)]
struct PublicKeyContent<'a> {
    #[serde(serialize_with = "as_base64")]
    content: &'a [u8],
}

fn as_base64<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64.encode(bytes))
}

/// The canonical JSON body for `(artifact digest, leaf PEM, signature)`.
pub fn canonical_body(
    artifact_digest: &Sha256Hash,
    leaf_pem: &[u8],
    signature: &SignatureBytes,
) -> Vec<u8> {
    let proposal = Proposal {
        api_version: "0.0.1",
        kind: "hashedrekord",
        spec: Spec {
            data: Data {
                hash: Hash {
                    algorithm: "sha256",
                    value: artifact_digest.to_hex(),
                },
            },
            signature: Signature {
                content: signature.to_base64(),
                public_key: PublicKeyContent { content: leaf_pem },
            },
        },
    };
    serde_json::to_vec(&proposal).expect("serialization of a plain struct cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_rekor_canonical_form() {
        let digest = Sha256Hash::from_hex(
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03",
        )
        .unwrap();
        let signature = SignatureBytes::new(b"sig".to_vec());
        let pem = b"-----BEGIN CERTIFICATE-----\nYWJjZA==\n-----END CERTIFICATE-----\n";

        let body = canonical_body(&digest, pem, &signature);
        let expected = format!(
            concat!(
                "{{\"apiVersion\":\"0.0.1\",\"kind\":\"hashedrekord\",\"spec\":",
                "{{\"data\":{{\"hash\":{{\"algorithm\":\"sha256\",",
                "\"value\":\"5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03\"}}}},",
                "\"signature\":{{\"content\":\"c2ln\",\"publicKey\":{{\"content\":\"{}\"}}}}}}}}"
            ),
            BASE64.encode(pem)
        );
        assert_eq!(String::from_utf8(body).unwrap(), expected);
    }

    #[test]
    fn no_trailing_newline_or_whitespace() {
        let digest = Sha256Hash::from_bytes([0u8; 32]);
        let body = canonical_body(&digest, b"pem", &SignatureBytes::new(vec![1]));
        let text = String::from_utf8(body).unwrap();
        assert!(!text.ends_with('\n'));
        assert!(!text.contains(": "));
        assert!(!text.contains(", "));
    }
}
