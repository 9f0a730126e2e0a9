//! Verification options.

use crate::matchers::CertificateMatcher;

/// Caller-supplied constraints on a verification.
#[derive(Debug, Default)]
pub struct VerificationOptions {
    /// Identity predicates over the signing certificate. Verification
    /// passes when the list is empty or at least one matcher matches.
    pub certificate_matchers: Vec<CertificateMatcher>,

    /// Treat a missing inclusion proof as a failure. Off by default:
    /// a valid signed entry timestamp is sufficient on its own.
    pub require_inclusion_proof: bool,
}

impl VerificationOptions {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_matcher(mut self, matcher: CertificateMatcher) -> Self {
        self.certificate_matchers.push(matcher);
        self
    }

    pub fn require_inclusion_proof(mut self) -> Self {
        self.require_inclusion_proof = true;
        self
    }
}
