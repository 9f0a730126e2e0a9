//! Error types for cryptographic operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The input is not a recognizable key encoding.
    #[error("bad key format: {0}")]
    BadKeyFormat(String),

    /// The key algorithm is recognized but not supported for verification.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Signature verification failed.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("DER error: {0}")]
    Der(String),

    #[error("checkpoint note error: {0}")]
    Checkpoint(String),

    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("key generation error: {0}")]
    KeyGeneration(String),
}

impl From<der::Error> for Error {
    fn from(e: der::Error) -> Self {
        Error::Der(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
