//! Trusted root providers.
//!
//! Verifiers are handed a provider rather than reaching for global state.
//! Three concrete forms exist: the public-good TUF repository, the
//! staging TUF repository, and a file on disk. The `SIGSTORE_TRUSTED_ROOT`
//! environment variable rewrites the TUF-backed forms into the file form
//! for offline use.

use std::path::PathBuf;

use keyless_tuf::{TufClient, TufConfig};

use crate::error::Result;
use crate::signing_config::SigningConfig;
use crate::trusted_root::TrustedRoot;

const TRUSTED_ROOT_TARGET: &str = "trusted_root.json";
const SIGNING_CONFIG_TARGET: &str = "signing_config.json";

/// Where the trusted root comes from.
pub struct TrustedRootProvider {
    source: Source,
}

enum Source {
    Tuf {
        config: TufConfig,
        seed_root: Vec<u8>,
    },
    File(PathBuf),
}

impl TrustedRootProvider {
    /// The Sigstore public-good instance, honoring `SIGSTORE_TRUSTED_ROOT`.
    pub fn public_good() -> Result<Self> {
        if let Some(provider) = Self::from_env() {
            return Ok(provider);
        }
        Ok(Self {
            source: Source::Tuf {
                config: TufConfig::public_good()?,
                seed_root: keyless_tuf::PUBLIC_GOOD_SEED_ROOT.to_vec(),
            },
        })
    }

    /// The Sigstore staging instance, honoring `SIGSTORE_TRUSTED_ROOT`.
    pub fn staging() -> Result<Self> {
        if let Some(provider) = Self::from_env() {
            return Ok(provider);
        }
        Ok(Self {
            source: Source::Tuf {
                config: TufConfig::staging()?,
                seed_root: keyless_tuf::STAGING_SEED_ROOT.to_vec(),
            },
        })
    }

    /// A trusted root stored on disk, for offline verification.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::File(path.into()),
        }
    }

    /// A custom TUF repository.
    pub fn from_tuf(config: TufConfig, seed_root: &[u8]) -> Self {
        Self {
            source: Source::Tuf {
                config,
                seed_root: seed_root.to_vec(),
            },
        }
    }

    fn from_env() -> Option<Self> {
        let path = std::env::var_os("SIGSTORE_TRUSTED_ROOT")?;
        tracing::debug!(?path, "using trusted root override from environment");
        Some(Self::file(PathBuf::from(path)))
    }

    /// Fetch (or read) and validate the trusted root.
    pub async fn get(&self) -> Result<TrustedRoot> {
        match &self.source {
            Source::File(path) => TrustedRoot::from_file(path),
            Source::Tuf { config, seed_root } => {
                let mut client = TufClient::new(config.clone(), seed_root);
                client.update_if_stale().await?;
                let bytes = client.fetch_target(TRUSTED_ROOT_TARGET).await?;
                let json = String::from_utf8(bytes).map_err(|e| {
                    crate::error::Error::Invalid(format!("trusted root is not UTF-8: {e}"))
                })?;
                TrustedRoot::from_json(&json)
            }
        }
    }

    /// Fetch (or read) the signing configuration, when the source can
    /// serve one.
    pub async fn signing_config(&self) -> Result<Option<SigningConfig>> {
        match &self.source {
            Source::File(_) => Ok(None),
            Source::Tuf { config, seed_root } => {
                let mut client = TufClient::new(config.clone(), seed_root);
                client.update_if_stale().await?;
                match client.fetch_target(SIGNING_CONFIG_TARGET).await {
                    Ok(bytes) => {
                        let json = String::from_utf8(bytes).map_err(|e| {
                            crate::error::Error::Invalid(format!(
                                "signing config is not UTF-8: {e}"
                            ))
                        })?;
                        Ok(Some(SigningConfig::from_json(&json)?))
                    }
                    Err(keyless_tuf::Error::TargetNotFound(_)) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_provider_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trusted_root.json");
        std::fs::write(
            &path,
            r#"{"mediaType":"application/vnd.dev.sigstore.trustedroot+json;version=0.1"}"#,
        )
        .unwrap();

        let provider = TrustedRootProvider::file(&path);
        let root = provider.get().await.unwrap();
        assert!(root.tlogs.is_empty());
        assert!(provider.signing_config().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_provider_surfaces_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trusted_root.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(TrustedRootProvider::file(&path).get().await.is_err());
    }
}
