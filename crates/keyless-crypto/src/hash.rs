//! Digest helpers.

use keyless_types::Sha256Hash;
use sha2::{Digest, Sha256, Sha384};

/// SHA-256 over `data`.
pub fn sha256(data: impl AsRef<[u8]>) -> Sha256Hash {
    let digest: [u8; 32] = Sha256::digest(data.as_ref()).into();
    Sha256Hash::from_bytes(digest)
}

/// SHA-384 over `data`.
pub fn sha384(data: impl AsRef<[u8]>) -> [u8; 48] {
    Sha384::digest(data.as_ref()).into()
}
