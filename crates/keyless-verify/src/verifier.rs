//! The keyless verification orchestrator.
//!
//! `verify` runs the full cascade over a `(artifact digest, bundle,
//! options)` input: bundle shape, digest consistency, certificate
//! validity, identity matching, log entry authenticity, log-body binding,
//! temporal binding, and finally the raw signature. The steps are totally
//! ordered and the first failure is the one reported.

use keyless_crypto::{x509, PublicKey, Verifier};
use keyless_trust_root::{TrustedRoot, TrustedRootProvider};
use keyless_types::{Bundle, Sha256Hash, SignatureContent};
use x509_cert::Certificate;

use crate::error::{Error, Result};
use crate::fulcio::FulcioVerifier;
use crate::hashedrekord;
use crate::options::VerificationOptions;
use crate::rekor::RekorVerifier;

/// Verifies hashed-rekord bundles produced by the keyless signing flow.
pub struct KeylessVerifier {
    fulcio: FulcioVerifier,
    rekor: RekorVerifier,
}

impl KeylessVerifier {
    pub fn builder() -> KeylessVerifierBuilder {
        KeylessVerifierBuilder::default()
    }

    /// Build a verifier over an already-obtained trusted root.
    pub fn new(trusted_root: &TrustedRoot) -> Self {
        Self {
            fulcio: FulcioVerifier::new(trusted_root),
            rekor: RekorVerifier::new(trusted_root),
        }
    }

    /// Convenience wrapper: hash a file and verify the digest.
    pub fn verify_file(
        &self,
        path: impl AsRef<std::path::Path>,
        bundle: &Bundle,
        options: &VerificationOptions,
    ) -> Result<()> {
        let contents = std::fs::read(&path).map_err(|e| {
            Error::BundleMalformed(format!(
                "could not read artifact {}: {e}",
                path.as_ref().display()
            ))
        })?;
        self.verify(&keyless_crypto::sha256(&contents), bundle, options)
    }

    /// Verify that the bundle attests to `artifact_digest` through the
    /// keyless infrastructure. Success is the absence of an error.
    pub fn verify(
        &self,
        artifact_digest: &Sha256Hash,
        bundle: &Bundle,
        options: &VerificationOptions,
    ) -> Result<()> {
        // (1) Bundle shape.
        let message_signature = match &bundle.content {
            SignatureContent::DsseEnvelope(_) => {
                return Err(Error::BundleMalformed(
                    "cannot verify DSSE-based bundles".into(),
                ))
            }
            SignatureContent::MessageSignature(ms) => ms,
        };
        let entries = bundle.entries();
        if entries.len() != 1 {
            return Err(Error::BundleMalformed(format!(
                "expected exactly 1 transparency log entry, found {}",
                entries.len()
            )));
        }
        if !bundle.timestamps().is_empty() {
            return Err(Error::BundleMalformed(
                "cannot verify bundles with RFC 3161 timestamp material".into(),
            ));
        }
        let cert_path = bundle.cert_path();
        if cert_path.is_empty() {
            return Err(Error::BundleMalformed(
                "bundle carries no signing certificate".into(),
            ));
        }
        let entry = &entries[0];

        // (2) The caller's digest must agree with the bundle's own claim.
        if let Some(digest) = &message_signature.message_digest {
            if &digest.digest != artifact_digest {
                return Err(Error::DigestMismatch);
            }
        }

        // (3) Certificate validity: chain, SCT, leaf profile.
        self.fulcio.verify_signing_certificate(&cert_path)?;

        let leaf = x509::parse(cert_path[0].as_bytes())
            .map_err(|e| Error::BundleMalformed(format!("unparseable leaf certificate: {e}")))?;

        // (4) Identity.
        check_certificate_matchers(&leaf, options)?;

        // (5) Log entry authenticity.
        self.rekor
            .verify_entry(entry, options.require_inclusion_proof)?;

        // (6) Log-body binding: the entry body must be exactly the
        // canonical hashed-rekord derived from our materials.
        let leaf_pem = x509::to_pem_bytes(cert_path[0].as_bytes());
        let expected_body =
            hashedrekord::canonical_body(artifact_digest, &leaf_pem, &message_signature.signature);
        if expected_body != entry.canonicalized_body.as_bytes() {
            return Err(Error::LogBindingMismatch);
        }

        // (7) Temporal binding: the certificate must have been valid when
        // the log integrated the entry, bounds inclusive.
        let (not_before, not_after) = x509::validity(&leaf);
        if entry.integrated_time < not_before || entry.integrated_time > not_after {
            return Err(Error::TimeOutOfValidity);
        }

        // (8) The signature itself.
        let key = PublicKey::from_spki_der(
            x509::spki_der(&leaf)
                .map_err(|e| Error::BundleMalformed(e.to_string()))?
                .as_bytes(),
        )
        .map_err(|_| Error::SignatureInvalid)?;
        Verifier::new(&key)
            .and_then(|v| v.verify_digest(artifact_digest.as_bytes(), &message_signature.signature))
            .map_err(|_| Error::SignatureInvalid)?;

        Ok(())
    }
}

/// Success iff the matcher list is empty or at least one matcher matches.
/// An evaluation failure is fatal and distinct from a clean non-match.
fn check_certificate_matchers(leaf: &Certificate, options: &VerificationOptions) -> Result<()> {
    if options.certificate_matchers.is_empty() {
        return Ok(());
    }
    for matcher in &options.certificate_matchers {
        if matcher
            .matches(leaf)
            .map_err(|e| Error::MatcherEvaluation(e.to_string()))?
        {
            return Ok(());
        }
    }
    let described: Vec<String> = options
        .certificate_matchers
        .iter()
        .map(|m| m.to_string())
        .collect();
    Err(Error::NoIdentityMatch(format!("[{}]", described.join(","))))
}

/// Builds a [`KeylessVerifier`] from a trusted root provider.
#[derive(Default)]
pub struct KeylessVerifierBuilder {
    provider: Option<TrustedRootProvider>,
}

impl KeylessVerifierBuilder {
    /// Use the Sigstore public-good instance.
    pub fn public_defaults(mut self) -> Result<Self> {
        self.provider = Some(TrustedRootProvider::public_good()?);
        Ok(self)
    }

    /// Use the Sigstore staging instance.
    pub fn staging_defaults(mut self) -> Result<Self> {
        self.provider = Some(TrustedRootProvider::staging()?);
        Ok(self)
    }

    /// Use an explicit provider.
    pub fn trusted_root_provider(mut self, provider: TrustedRootProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Resolve the trusted root and build the verifier.
    pub async fn build(self) -> Result<KeylessVerifier> {
        let provider = self.provider.ok_or_else(|| {
            Error::TrustRoot(keyless_trust_root::Error::Invalid(
                "no trusted root provider configured".into(),
            ))
        })?;
        let trusted_root = provider.get().await?;
        Ok(KeylessVerifier::new(&trusted_root))
    }
}
