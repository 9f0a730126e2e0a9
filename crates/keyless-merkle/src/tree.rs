//! RFC 6962 hashing primitives.
//!
//! Leaf and interior hashes are domain-separated with a one-byte prefix
//! (0x00 for leaves, 0x01 for interior nodes) so a leaf can never be
//! confused with a subtree root.

use sha2::{Digest, Sha256};

pub const LEAF_PREFIX: u8 = 0x00;
pub const NODE_PREFIX: u8 = 0x01;
pub const HASH_SIZE: usize = 32;

/// `SHA256(0x00 || data)`
pub fn hash_leaf(data: &[u8]) -> [u8; HASH_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(data);
    hasher.finalize().into()
}

/// `SHA256(0x01 || left || right)`
pub fn hash_children(left: &[u8; HASH_SIZE], right: &[u8; HASH_SIZE]) -> [u8; HASH_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Position of the most significant set bit.
pub fn bit_length(n: u64) -> u32 {
    64 - n.leading_zeros()
}
