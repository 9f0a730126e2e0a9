//! The signing configuration target.
//!
//! `signing_config.json` lists the service endpoints a signing client
//! would use. Verification does not call any of them, but the target is
//! fetched and parsed alongside the trusted root so callers get both from
//! one provider.

use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningConfig {
    pub media_type: String,
    #[serde(default)]
    pub ca_url: Option<String>,
    #[serde(default)]
    pub oidc_url: Option<String>,
    #[serde(default)]
    pub tlog_urls: Vec<String>,
    #[serde(default)]
    pub tsa_urls: Vec<String>,
}

impl SigningConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
