//! The TUF update workflow and target fetching.
//!
//! `update()` walks the root chain from the currently trusted root (cached
//! or embedded seed), then validates timestamp, snapshot, and targets in
//! order. Every security-relevant failure is fatal; the client never
//! quietly serves stale or unverified metadata. Transient network errors
//! are retried with exponential backoff.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use fs4::fs_std::FileExt;
use url::Url;

use crate::error::{Error, NetworkError, Result};
use crate::metadata::{
    Envelope, Role, Root, Snapshot, Targets, Timestamp, ROOT_ROLE, SNAPSHOT_ROLE, TARGETS_ROLE,
    TIMESTAMP_ROLE,
};
use crate::transport::{FileTransport, HttpTransport, Transport, TransportError};
use crate::{PUBLIC_GOOD_SEED_ROOT, PUBLIC_GOOD_TUF_URL, STAGING_SEED_ROOT, STAGING_TUF_URL};

/// Default interval after which a successful refresh goes stale.
pub const DEFAULT_CACHE_VALIDITY: Duration = Duration::from_secs(24 * 60 * 60);

const DEFAULT_MAX_ATTEMPTS: u32 = 4;
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(250);
const MAX_ROOT_WALK: u64 = 1024;
const LAST_REFRESH_FILE: &str = "last_refresh";
const LOCK_FILE: &str = ".lock";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct TufConfig {
    pub metadata_base: Url,
    pub targets_base: Url,
    pub cache_dir: PathBuf,
    pub cache_validity: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl TufConfig {
    /// Configuration for a repository at `base_url` with the standard
    /// `targets/` layout.
    pub fn for_repository(base_url: &str) -> Result<Self> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let metadata_base = Url::parse(&base).map_err(|e| Error::Url(e.to_string()))?;
        let targets_base = metadata_base
            .join("targets/")
            .map_err(|e| Error::Url(e.to_string()))?;
        let cache_dir = default_cache_dir(&metadata_base)?;
        Ok(Self {
            metadata_base,
            targets_base,
            cache_dir,
            cache_validity: DEFAULT_CACHE_VALIDITY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
        })
    }

    pub fn public_good() -> Result<Self> {
        Self::for_repository(PUBLIC_GOOD_TUF_URL)
    }

    pub fn staging() -> Result<Self> {
        Self::for_repository(STAGING_TUF_URL)
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_cache_validity(mut self, validity: Duration) -> Self {
        self.cache_validity = validity;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }
}

/// The default cache directory: the platform cache location, one
/// subdirectory per repository host, unless `SIGSTORE_TUF_CACHE` points
/// elsewhere.
fn default_cache_dir(metadata_base: &Url) -> Result<PathBuf> {
    let host = metadata_base.host_str().unwrap_or("local").to_string();
    if let Ok(dir) = std::env::var("SIGSTORE_TUF_CACHE") {
        return Ok(PathBuf::from(dir).join(host));
    }
    match directories::ProjectDirs::from("dev", "sigstore", "keyless") {
        Some(project) => Ok(project.cache_dir().join("tuf").join(host)),
        None => Ok(std::env::temp_dir().join("keyless-tuf").join(host)),
    }
}

/// Fully validated metadata for one repository.
struct Trusted {
    root: Root,
    timestamp: Timestamp,
    snapshot: Snapshot,
    targets: Targets,
}

/// A TUF repository client.
pub struct TufClient {
    config: TufConfig,
    transport: Box<dyn Transport>,
    seed_root: Vec<u8>,
    trusted: Option<Trusted>,
}

impl TufClient {
    pub fn new(config: TufConfig, seed_root: &[u8]) -> Self {
        Self {
            config,
            transport: Box::new(HttpTransport::new()),
            seed_root: seed_root.to_vec(),
            trusted: None,
        }
    }

    pub fn public_good() -> Result<Self> {
        Ok(Self::new(TufConfig::public_good()?, PUBLIC_GOOD_SEED_ROOT))
    }

    pub fn staging() -> Result<Self> {
        Ok(Self::new(TufConfig::staging()?, STAGING_SEED_ROOT))
    }

    /// Replace the transport. Tests serve repositories from a directory
    /// through [`FileTransport`].
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Box::new(transport);
        self
    }

    /// Convenience constructor for a `file://` repository.
    pub fn for_local_repository(config: TufConfig, seed_root: &[u8]) -> Self {
        Self::new(config, seed_root).with_transport(FileTransport)
    }

    /// Whether a refresh is due: never refreshed, refreshed too long ago,
    /// or any validated metadata past its expiry.
    pub fn is_stale(&self) -> bool {
        let Some(trusted) = &self.trusted else {
            return true;
        };
        let now = Utc::now();
        if trusted.root.check_expiry(now).is_err()
            || trusted.timestamp.check_expiry(now).is_err()
            || trusted.snapshot.check_expiry(now).is_err()
            || trusted.targets.check_expiry(now).is_err()
        {
            return true;
        }
        match self.last_refresh() {
            Some(at) => {
                let validity = chrono::Duration::from_std(self.config.cache_validity)
                    .unwrap_or_else(|_| chrono::Duration::days(1));
                at + validity <= now
            }
            None => true,
        }
    }

    /// Run the update workflow unless the current metadata is fresh.
    ///
    /// A complete, unexpired disk cache within its validity window is
    /// loaded without touching the network.
    pub async fn update_if_stale(&mut self) -> Result<()> {
        if self.trusted.is_none() {
            self.load_cached().await;
        }
        if self.is_stale() {
            self.update().await?;
        }
        Ok(())
    }

    /// Re-validate and adopt the cached metadata set, if complete. The
    /// cached files were threshold-verified before being written, but they
    /// are checked again here rather than trusted on faith.
    async fn load_cached(&mut self) {
        let result: Result<Trusted> = async {
            let root_bytes = self
                .read_cached(ROOT_FILE)
                .await
                .ok_or(Error::NotInitialized)?;
            let envelope = Envelope::from_bytes(&root_bytes)?;
            let root: Root = envelope.parse_signed()?;
            root.verify_role(ROOT_ROLE, &envelope)?;

            let ts_bytes = self
                .read_cached(TIMESTAMP_FILE)
                .await
                .ok_or(Error::NotInitialized)?;
            let envelope = Envelope::from_bytes(&ts_bytes)?;
            let timestamp: Timestamp = envelope.parse_signed()?;
            root.verify_role(TIMESTAMP_ROLE, &envelope)?;

            let snapshot_bytes = self
                .read_cached(SNAPSHOT_FILE)
                .await
                .ok_or(Error::NotInitialized)?;
            let envelope = Envelope::from_bytes(&snapshot_bytes)?;
            let snapshot: Snapshot = envelope.parse_signed()?;
            root.verify_role(SNAPSHOT_ROLE, &envelope)?;

            let targets_bytes = self
                .read_cached(TARGETS_FILE)
                .await
                .ok_or(Error::NotInitialized)?;
            let envelope = Envelope::from_bytes(&targets_bytes)?;
            let targets: Targets = envelope.parse_signed()?;
            root.verify_role(TARGETS_ROLE, &envelope)?;

            Ok(Trusted {
                root,
                timestamp,
                snapshot,
                targets,
            })
        }
        .await;

        match result {
            Ok(trusted) => self.trusted = Some(trusted),
            Err(e) => tracing::debug!("cached TUF metadata not usable: {e}"),
        }
    }

    /// Run the full update workflow: root chain walk, then timestamp,
    /// snapshot, and targets.
    pub async fn update(&mut self) -> Result<()> {
        self.update_with_deadline(None).await
    }

    /// As [`TufClient::update`], aborting in-flight work once `deadline`
    /// elapses.
    pub async fn update_with_deadline(&mut self, deadline: Option<Duration>) -> Result<()> {
        match deadline {
            Some(limit) => tokio::time::timeout(limit, self.update_inner())
                .await
                .map_err(|_| Error::Network(NetworkError::DeadlineExceeded))?,
            None => self.update_inner().await,
        }
    }

    async fn update_inner(&mut self) -> Result<()> {
        let _lock = CacheLock::acquire(&self.config.cache_dir)?;
        let now = Utc::now();

        // 1. Establish the trusted root: the cached copy if one exists,
        //    the embedded seed otherwise. Either way it must satisfy its
        //    own root-role threshold.
        let initial = match self.read_cached(ROOT_FILE).await {
            Some(bytes) => bytes,
            None => self.seed_root.clone(),
        };
        let envelope = Envelope::from_bytes(&initial)?;
        let mut root: Root = envelope.parse_signed()?;
        root.verify_role(ROOT_ROLE, &envelope)?;

        // 2. Walk the root chain until the repository runs out of newer
        //    versions. Each step must verify under both the previous and
        //    the candidate root, and versions must advance one at a time.
        for _ in 0..MAX_ROOT_WALK {
            let next_version = root.version + 1;
            let url = self.metadata_url(&format!("{next_version}.root.json"))?;
            let bytes = match self.fetch_with_retry(url).await {
                Ok(bytes) => bytes,
                Err(TransportError::NotFound(_)) => break,
                Err(other) => {
                    return Err(Error::Network(NetworkError::Failed(other.to_string())))
                }
            };
            let envelope = Envelope::from_bytes(&bytes)?;
            let candidate: Root = envelope.parse_signed()?;
            root.verify_role(ROOT_ROLE, &envelope)?;
            candidate.verify_role(ROOT_ROLE, &envelope)?;
            if candidate.version != next_version {
                return Err(Error::Rollback {
                    role: ROOT_ROLE,
                    trusted: root.version,
                    fetched: candidate.version,
                });
            }
            tracing::debug!(version = candidate.version, "advanced trusted root");
            self.write_cached(ROOT_FILE, &bytes).await?;
            root = candidate;
        }
        root.check_expiry(now)?;

        // 3. Timestamp.
        let bytes = self.fetch(self.metadata_url("timestamp.json")?).await?;
        let envelope = Envelope::from_bytes(&bytes)?;
        let timestamp: Timestamp = envelope.parse_signed()?;
        root.verify_role(TIMESTAMP_ROLE, &envelope)?;
        if let Some(trusted_version) = self.cached_version(TIMESTAMP_FILE).await {
            if timestamp.version < trusted_version {
                return Err(Error::Rollback {
                    role: TIMESTAMP_ROLE,
                    trusted: trusted_version,
                    fetched: timestamp.version,
                });
            }
        }
        timestamp.check_expiry(now)?;
        self.write_cached(TIMESTAMP_FILE, &bytes).await?;

        // 4. Snapshot, pinned by timestamp.
        let snapshot_meta = timestamp.snapshot_meta()?.clone();
        let name = if root.consistent_snapshot {
            format!("{}.snapshot.json", snapshot_meta.version)
        } else {
            "snapshot.json".to_string()
        };
        let bytes = self.fetch(self.metadata_url(&name)?).await?;
        snapshot_meta.check("snapshot.json", &bytes)?;
        let envelope = Envelope::from_bytes(&bytes)?;
        let snapshot: Snapshot = envelope.parse_signed()?;
        root.verify_role(SNAPSHOT_ROLE, &envelope)?;
        if snapshot.version != snapshot_meta.version {
            return Err(Error::VersionMismatch {
                role: SNAPSHOT_ROLE,
                expected: snapshot_meta.version,
                actual: snapshot.version,
            });
        }
        if let Some(trusted_version) = self.cached_version(SNAPSHOT_FILE).await {
            if snapshot.version < trusted_version {
                return Err(Error::Rollback {
                    role: SNAPSHOT_ROLE,
                    trusted: trusted_version,
                    fetched: snapshot.version,
                });
            }
        }
        snapshot.check_expiry(now)?;
        self.write_cached(SNAPSHOT_FILE, &bytes).await?;

        // 5. Targets, pinned by snapshot.
        let targets_meta = snapshot.targets_meta()?.clone();
        let name = if root.consistent_snapshot {
            format!("{}.targets.json", targets_meta.version)
        } else {
            "targets.json".to_string()
        };
        let bytes = self.fetch(self.metadata_url(&name)?).await?;
        targets_meta.check("targets.json", &bytes)?;
        let envelope = Envelope::from_bytes(&bytes)?;
        let targets: Targets = envelope.parse_signed()?;
        root.verify_role(TARGETS_ROLE, &envelope)?;
        if targets.version != targets_meta.version {
            return Err(Error::VersionMismatch {
                role: TARGETS_ROLE,
                expected: targets_meta.version,
                actual: targets.version,
            });
        }
        targets.check_expiry(now)?;
        self.write_cached(TARGETS_FILE, &bytes).await?;

        self.write_cached(LAST_REFRESH_FILE, now.to_rfc3339().as_bytes())
            .await?;
        tracing::debug!(
            root = root.version,
            timestamp = timestamp.version,
            snapshot = snapshot.version,
            targets = targets.version,
            "TUF metadata refreshed"
        );
        self.trusted = Some(Trusted {
            root,
            timestamp,
            snapshot,
            targets,
        });
        Ok(())
    }

    /// Download a target file and verify its length and hash against the
    /// validated targets metadata.
    pub async fn fetch_target(&self, name: &str) -> Result<Vec<u8>> {
        let trusted = self.trusted.as_ref().ok_or(Error::NotInitialized)?;
        let meta = trusted
            .targets
            .targets
            .get(name)
            .ok_or_else(|| Error::TargetNotFound(name.to_string()))?;

        let path = if trusted.root.consistent_snapshot {
            consistent_target_path(name, meta.sha256()?)
        } else {
            name.to_string()
        };
        let url = self
            .config
            .targets_base
            .join(&path)
            .map_err(|e| Error::Url(e.to_string()))?;

        let bytes = self.fetch(url).await?;
        meta.check(name, &bytes)?;
        Ok(bytes)
    }

    fn metadata_url(&self, name: &str) -> Result<Url> {
        self.config
            .metadata_base
            .join(name)
            .map_err(|e| Error::Url(e.to_string()))
    }

    async fn fetch(&self, url: Url) -> Result<Vec<u8>> {
        self.fetch_with_retry(url)
            .await
            .map_err(|e| Error::Network(NetworkError::Failed(e.to_string())))
    }

    /// Fetch with exponential backoff. Only transient failures retry;
    /// a missing resource is reported immediately.
    async fn fetch_with_retry(&self, url: Url) -> std::result::Result<Vec<u8>, TransportError> {
        let mut delay = self.config.backoff_base;
        let mut last_failure = None;
        for attempt in 0..self.config.max_attempts.max(1) {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            match self.transport.fetch(url.clone()).await {
                Ok(bytes) => return Ok(bytes),
                Err(TransportError::NotFound(url)) => return Err(TransportError::NotFound(url)),
                Err(failure) => {
                    tracing::debug!(%url, attempt, "fetch failed: {failure}");
                    last_failure = Some(failure);
                }
            }
        }
        Err(last_failure.expect("at least one attempt was made"))
    }

    fn last_refresh(&self) -> Option<DateTime<Utc>> {
        let text = std::fs::read_to_string(self.config.cache_dir.join(LAST_REFRESH_FILE)).ok()?;
        DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    async fn read_cached(&self, name: &str) -> Option<Vec<u8>> {
        tokio::fs::read(self.config.cache_dir.join(name)).await.ok()
    }

    async fn write_cached(&self, name: &str, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.config.cache_dir).await?;
        tokio::fs::write(self.config.cache_dir.join(name), bytes).await?;
        Ok(())
    }

    /// The version a previously validated cached copy recorded, if any.
    async fn cached_version(&self, name: &str) -> Option<u64> {
        let bytes = self.read_cached(name).await?;
        let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
        value.get("signed")?.get("version")?.as_u64()
    }
}

const ROOT_FILE: &str = "root.json";
const TIMESTAMP_FILE: &str = "timestamp.json";
const SNAPSHOT_FILE: &str = "snapshot.json";
const TARGETS_FILE: &str = "targets.json";

/// Consistent-snapshot target path: the hash prefixes the basename, not
/// the directory part.
fn consistent_target_path(name: &str, sha256: &str) -> String {
    match name.rsplit_once('/') {
        Some((dir, base)) => format!("{dir}/{sha256}.{base}"),
        None => format!("{sha256}.{name}"),
    }
}

/// Advisory lock over the cache directory, held for the whole of
/// `update()`. Coordinates concurrent processes sharing one cache.
struct CacheLock {
    file: std::fs::File,
}

impl CacheLock {
    fn acquire(cache_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(cache_dir.join(LOCK_FILE))?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
