//! Error types for the TUF client.
//!
//! Rollback, expiry, threshold, and hash failures are fatal: the client
//! never falls back to cached metadata that would mask them. Network
//! failures are the only retried class, and surface here once retries are
//! exhausted.

use thiserror::Error;

/// The network-failure class: transport failures after retries are
/// exhausted, and the caller's deadline expiring mid-update.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("{0}")]
    Failed(String),

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("version rollback for {role}: fetched version {fetched} is older than trusted {trusted}")]
    Rollback {
        role: &'static str,
        trusted: u64,
        fetched: u64,
    },

    #[error("{role} metadata expired at {expires}")]
    Expired {
        role: &'static str,
        expires: chrono::DateTime<chrono::Utc>,
    },

    #[error("signature threshold not met for {role}: {verified} of {threshold} required signatures")]
    ThresholdUnmet {
        role: &'static str,
        verified: usize,
        threshold: u32,
    },

    #[error("{role} version {actual} does not match the version {expected} listed by its parent")]
    VersionMismatch {
        role: &'static str,
        expected: u64,
        actual: u64,
    },

    #[error("hash mismatch for {0}")]
    HashMismatch(String),

    #[error("length mismatch for {name}: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error("metadata declares type {actual}, expected {expected}")]
    WrongType {
        expected: &'static str,
        actual: String,
    },

    #[error("role {0} is not defined in root metadata")]
    RoleNotFound(&'static str),

    #[error("target not found in targets metadata: {0}")]
    TargetNotFound(String),

    #[error("client has no validated metadata; run update() first")]
    NotInitialized,

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("invalid repository URL: {0}")]
    Url(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("canonical JSON encoding failed: {0}")]
    Canonicalization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Crypto(#[from] keyless_crypto::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
