//! The trusted root: the enumeration of Fulcio CAs, Rekor log keys, and
//! CT log keys that verification trusts, each bounded by a validity
//! interval.
//!
//! The root is distributed as `trusted_root.json` through a TUF
//! repository; [`TrustedRootProvider`] covers the three ways to obtain it
//! (public-good TUF, staging TUF, a file on disk).

pub mod error;
pub mod provider;
pub mod signing_config;
pub mod trusted_root;

pub use error::{Error, Result};
pub use provider::TrustedRootProvider;
pub use signing_config::SigningConfig;
pub use trusted_root::{
    CertificateAuthority, LogInstance, LogPublicKey, TrustedRoot, ValidityPeriod,
};
