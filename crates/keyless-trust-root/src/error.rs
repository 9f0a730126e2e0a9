//! Error types for trusted root handling.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to parse trusted root: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error reading trusted root: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid trusted root: {0}")]
    Invalid(String),

    #[error("TUF error: {0}")]
    Tuf(#[from] keyless_tuf::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
