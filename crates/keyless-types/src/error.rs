//! Error types for the data model.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("base64 decoding error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("unrecognized bundle media type: {0}")]
    UnknownMediaType(String),

    #[error("missing required field: {0}")]
    MissingField(String),
}

pub type Result<T> = std::result::Result<T, Error>;
