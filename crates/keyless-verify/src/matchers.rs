//! Certificate identity matchers.
//!
//! A matcher is a predicate over the signing certificate with a `Display`
//! form for diagnostics. String matchers compare a certificate field
//! (SAN email, SAN URI, or the Fulcio OIDC issuer extension) against a
//! literal or a regular expression; `all` conjoins matchers, typically a
//! SAN matcher with an issuer matcher. A failure while reading the
//! certificate is an evaluation error, never a silent non-match.

use keyless_crypto::x509;
use thiserror::Error;
use x509_cert::Certificate;

/// The matcher failed to evaluate, as opposed to cleanly not matching.
#[derive(Debug, Error)]
#[error("matcher evaluation failed: {0}")]
pub struct MatcherError(pub String);

/// The certificate field a string matcher reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateField {
    SanEmail,
    SanUri,
    /// The OIDC issuer recorded by Fulcio
    /// (extensions 1.3.6.1.4.1.57264.1.8 / 1.3.6.1.4.1.57264.1.1).
    Issuer,
}

impl std::fmt::Display for CertificateField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CertificateField::SanEmail => "san-email",
            CertificateField::SanUri => "san-uri",
            CertificateField::Issuer => "issuer",
        };
        f.write_str(name)
    }
}

/// Literal or regex comparison.
#[derive(Debug, Clone)]
pub enum StringMatcher {
    Equals(String),
    Regex(regex::Regex),
}

impl StringMatcher {
    fn matches(&self, value: &str) -> bool {
        match self {
            StringMatcher::Equals(expected) => expected == value,
            StringMatcher::Regex(re) => re.is_match(value),
        }
    }
}

impl std::fmt::Display for StringMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StringMatcher::Equals(s) => write!(f, "'{s}'"),
            StringMatcher::Regex(re) => write!(f, "/{re}/"),
        }
    }
}

/// A predicate over the signing certificate.
#[derive(Debug, Clone)]
pub enum CertificateMatcher {
    Field {
        field: CertificateField,
        matcher: StringMatcher,
    },
    /// Matches only when every inner matcher matches.
    All(Vec<CertificateMatcher>),
}

impl CertificateMatcher {
    pub fn san_email(matcher: StringMatcher) -> Self {
        CertificateMatcher::Field {
            field: CertificateField::SanEmail,
            matcher,
        }
    }

    pub fn san_uri(matcher: StringMatcher) -> Self {
        CertificateMatcher::Field {
            field: CertificateField::SanUri,
            matcher,
        }
    }

    pub fn issuer(matcher: StringMatcher) -> Self {
        CertificateMatcher::Field {
            field: CertificateField::Issuer,
            matcher,
        }
    }

    /// The usual identity policy: a subject predicate conjoined with an
    /// issuer predicate.
    pub fn all(subject: CertificateMatcher, issuer: CertificateMatcher) -> Self {
        CertificateMatcher::All(vec![subject, issuer])
    }

    /// Evaluate against a certificate.
    pub fn matches(&self, cert: &Certificate) -> Result<bool, MatcherError> {
        match self {
            CertificateMatcher::Field { field, matcher } => {
                let value = read_field(cert, *field)?;
                Ok(value.map(|v| matcher.matches(&v)).unwrap_or(false))
            }
            CertificateMatcher::All(inner) => {
                for matcher in inner {
                    if !matcher.matches(cert)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }
}

fn read_field(cert: &Certificate, field: CertificateField) -> Result<Option<String>, MatcherError> {
    let result = match field {
        CertificateField::SanEmail => x509::san_email(cert),
        CertificateField::SanUri => x509::san_uri(cert),
        CertificateField::Issuer => x509::oidc_issuer(cert),
    };
    result.map_err(|e| MatcherError(e.to_string()))
}

impl std::fmt::Display for CertificateMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CertificateMatcher::Field { field, matcher } => write!(f, "{field}~{matcher}"),
            CertificateMatcher::All(inner) => {
                write!(f, "all(")?;
                for (i, matcher) in inner.iter().enumerate() {
                    if i > 0 {
                        write!(f, " && ")?;
                    }
                    write!(f, "{matcher}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_matcher_forms() {
        assert!(StringMatcher::Equals("a@b".into()).matches("a@b"));
        assert!(!StringMatcher::Equals("a@b".into()).matches("c@d"));

        let re = StringMatcher::Regex(regex::Regex::new(r"^.+@example\.com$").unwrap());
        assert!(re.matches("alice@example.com"));
        assert!(!re.matches("alice@example.org"));
    }

    #[test]
    fn display_is_diagnostic() {
        let m = CertificateMatcher::all(
            CertificateMatcher::san_email(StringMatcher::Equals("a@b".into())),
            CertificateMatcher::issuer(StringMatcher::Equals("https://issuer".into())),
        );
        assert_eq!(m.to_string(), "all(san-email~'a@b' && issuer~'https://issuer')");
    }
}
