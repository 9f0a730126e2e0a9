//! Inclusion proof verification.
//!
//! Follows the RFC 6962 audit path algorithm as implemented by the
//! sigstore-go and sigstore-python reference clients: walk from the leaf
//! towards the root, hashing the sibling from the proof on the side the
//! index dictates.

use crate::error::{Error, Result};
use crate::tree::{bit_length, hash_children, HASH_SIZE};

/// Verify that `leaf_hash` sits at `leaf_index` in a tree of `tree_size`
/// leaves whose root is `expected_root`.
pub fn verify_inclusion(
    leaf_hash: &[u8; HASH_SIZE],
    leaf_index: u64,
    tree_size: u64,
    proof: &[[u8; HASH_SIZE]],
    expected_root: &[u8; HASH_SIZE],
) -> Result<()> {
    if tree_size == 0 {
        return Err(Error::InvalidTreeSize("tree is empty".into()));
    }
    if leaf_index >= tree_size {
        return Err(Error::IndexOutOfRange {
            index: leaf_index,
            tree_size,
        });
    }

    let expected_len = audit_path_length(leaf_index, tree_size);
    if proof.len() != expected_len {
        return Err(Error::WrongProofLength {
            expected: expected_len,
            actual: proof.len(),
        });
    }

    let mut hash = *leaf_hash;
    let mut index = leaf_index;
    let mut last = tree_size - 1;

    for sibling in proof {
        // A right child, or the rightmost node of an incomplete level,
        // takes its sibling on the left.
        if index % 2 == 1 || index == last {
            hash = hash_children(sibling, &hash);
        } else {
            hash = hash_children(&hash, sibling);
        }
        index /= 2;
        last /= 2;
    }

    if &hash != expected_root {
        return Err(Error::RootMismatch {
            expected: hex::encode(expected_root),
            actual: hex::encode(hash),
        });
    }
    Ok(())
}

/// Number of hashes in the audit path for `index` within `tree_size`.
fn audit_path_length(index: u64, tree_size: u64) -> usize {
    let inner = bit_length(index ^ (tree_size - 1)) as usize;
    let border = (index >> inner).count_ones() as usize;
    inner + border
}
