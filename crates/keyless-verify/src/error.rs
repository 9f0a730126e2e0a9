//! The verification error taxonomy.
//!
//! Every failure surfaces to the caller as one [`Error`]; the variant is
//! the diagnostic. Failures are never downgraded: the orchestrator stops
//! at the first failing step and reports it.

use thiserror::Error;

/// Certificate-side failures.
#[derive(Debug, Error)]
pub enum FulcioError {
    #[error("no path to a trusted CA could be built: {0}")]
    ChainBuildFailed(String),

    #[error("no trusted CA was active when the certificate became valid")]
    UntrustedCa,

    #[error("certificate carries no SCT list extension")]
    MissingSct,

    #[error("no embedded SCT verified against a trusted CT log")]
    NoValidSct,

    #[error("certificate violates the signing profile: {0}")]
    BadLeafConstraints(String),
}

/// Transparency-log failures.
#[derive(Debug, Error)]
pub enum RekorError {
    #[error("log {0} is not in the trusted root")]
    UntrustedLog(String),

    #[error("log key was not valid at integrated time {0}")]
    LogKeyExpired(i64),

    #[error("signed entry timestamp did not verify: {0}")]
    BadSet(String),

    #[error("inclusion proof did not verify: {0}")]
    BadInclusionProof(String),

    #[error("checkpoint did not verify: {0}")]
    BadCheckpoint(String),
}

/// The keyless verification error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed bundle: {0}")]
    BundleMalformed(String),

    #[error("provided artifact digest does not match the digest in the bundle")]
    DigestMismatch,

    #[error("Fulcio certificate was not valid: {0}")]
    Fulcio(#[from] FulcioError),

    #[error("could not evaluate certificate identities: {0}")]
    MatcherEvaluation(String),

    #[error("no provided certificate identities matched values in certificate: {0}")]
    NoIdentityMatch(String),

    #[error("Rekor entry was not valid: {0}")]
    Rekor(#[from] RekorError),

    #[error("provided verification materials are inconsistent with the log entry")]
    LogBindingMismatch,

    #[error("log integration time is outside the certificate validity window")]
    TimeOutOfValidity,

    #[error("artifact signature was not valid")]
    SignatureInvalid,

    #[error("trusted root unavailable: {0}")]
    TrustRoot(#[from] keyless_trust_root::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
