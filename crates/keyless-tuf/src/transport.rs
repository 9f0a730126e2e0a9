//! Repository transports.
//!
//! The client fetches by URL through a small transport abstraction so that
//! tests (and air-gapped mirrors) can serve a repository from a directory
//! while production uses HTTP. A missing file is a distinct outcome from a
//! transient failure: only the latter is worth retrying.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The resource does not exist. Terminates the root chain walk; fatal
    /// everywhere else.
    #[error("not found: {0}")]
    NotFound(Url),

    /// Anything else: connection failures, server errors, bad status.
    #[error("transport failure for {url}: {reason}")]
    Failure { url: Url, reason: String },
}

pub type FetchResult = std::result::Result<Vec<u8>, TransportError>;

/// A fetcher for repository files.
pub trait Transport: Send + Sync {
    fn fetch(&self, url: Url) -> Pin<Box<dyn Future<Output = FetchResult> + Send + '_>>;
}

/// HTTP transport backed by reqwest.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: Url) -> Pin<Box<dyn Future<Output = FetchResult> + Send + '_>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| TransportError::Failure {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;

            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(TransportError::NotFound(url));
            }
            if !response.status().is_success() {
                return Err(TransportError::Failure {
                    url,
                    reason: format!("unexpected status {}", response.status()),
                });
            }

            let bytes = response.bytes().await.map_err(|e| TransportError::Failure {
                url,
                reason: e.to_string(),
            })?;
            Ok(bytes.to_vec())
        })
    }
}

/// Transport serving `file://` URLs from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FileTransport;

impl Transport for FileTransport {
    fn fetch(&self, url: Url) -> Pin<Box<dyn Future<Output = FetchResult> + Send + '_>> {
        Box::pin(async move {
            let path = url
                .to_file_path()
                .map_err(|_| TransportError::Failure {
                    url: url.clone(),
                    reason: "not a file:// URL".to_string(),
                })?;
            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(TransportError::NotFound(url))
                }
                Err(e) => Err(TransportError::Failure {
                    url,
                    reason: e.to_string(),
                }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_transport_distinguishes_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("present.json"), b"{}").unwrap();

        let transport = FileTransport;
        let base = Url::from_directory_path(dir.path()).unwrap();

        let ok = transport.fetch(base.join("present.json").unwrap()).await;
        assert_eq!(ok.unwrap(), b"{}");

        let missing = transport.fetch(base.join("absent.json").unwrap()).await;
        assert!(matches!(missing, Err(TransportError::NotFound(_))));
    }
}
