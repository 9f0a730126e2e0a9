//! A TUF client for Sigstore trust material.
//!
//! Implements the client-side workflow of The Update Framework: walk the
//! root chain from an embedded seed, then validate timestamp, snapshot,
//! and targets metadata, and finally fetch hash-checked target files.
//! Validated metadata is cached on disk between invocations.
//!
//! The two targets consumed by verification are `trusted_root.json` and
//! `signing_config.json`; this crate hands back their bytes, parsing is
//! the trust-root crate's concern.

pub mod client;
pub mod error;
pub mod metadata;
pub mod transport;

pub use client::{TufClient, TufConfig};
pub use error::{Error, NetworkError, Result};
pub use metadata::{Envelope, MetaFile, Root, RoleKeys, Snapshot, TargetMeta, Targets, Timestamp};
pub use transport::{FileTransport, HttpTransport, Transport, TransportError};

/// Metadata base URL of the Sigstore public-good TUF repository.
pub const PUBLIC_GOOD_TUF_URL: &str = "https://tuf-repo-cdn.sigstore.dev";

/// Metadata base URL of the Sigstore staging TUF repository.
pub const STAGING_TUF_URL: &str = "https://tuf-repo-cdn.sigstage.dev";

/// Embedded seed root for the public-good repository.
///
/// Updated by re-vendoring when the root rotates; the chain walk brings a
/// stale seed forward on first update.
pub const PUBLIC_GOOD_SEED_ROOT: &[u8] = include_bytes!("../repository/root.json");

/// Embedded seed root for the staging repository.
pub const STAGING_SEED_ROOT: &[u8] = include_bytes!("../repository/root_staging.json");
