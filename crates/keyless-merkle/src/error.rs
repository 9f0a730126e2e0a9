//! Error types for Merkle proof verification.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid tree size: {0}")]
    InvalidTreeSize(String),

    #[error("leaf index {index} is outside tree of size {tree_size}")]
    IndexOutOfRange { index: u64, tree_size: u64 },

    #[error("proof has wrong length: expected {expected} hashes, got {actual}")]
    WrongProofLength { expected: usize, actual: usize },

    #[error("computed root {actual} does not match expected root {expected}")]
    RootMismatch { expected: String, actual: String },
}

pub type Result<T> = std::result::Result<T, Error>;
