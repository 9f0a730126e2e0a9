//! Minimal DSSE envelope model.
//!
//! Keyless verification rejects DSSE-based bundles outright, but the bundle
//! parser still needs to recognize the envelope shape to do so.

use crate::encoding::SignatureBytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DsseEnvelope {
    pub payload: String,
    pub payload_type: String,
    #[serde(default)]
    pub signatures: Vec<DsseSignature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DsseSignature {
    pub sig: SignatureBytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyid: Option<String>,
}
