//! RFC 6962 Merkle tree arithmetic.
//!
//! Provides the domain-separated hashing primitives and the inclusion
//! proof verification used to check Rekor log entries against a signed
//! tree head.

pub mod error;
pub mod proof;
pub mod tree;

pub use error::{Error, Result};
pub use proof::verify_inclusion;
pub use tree::{hash_children, hash_leaf, HASH_SIZE};
