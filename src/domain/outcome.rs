//! Issuance outcome types.
//!
//! This module defines the result of one run of the external issuer.

use std::fmt;
use std::path::PathBuf;

/// Certificate and private key locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Outcome of one issuance invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuanceOutcome {
    /// Certificate issued and published to the serving location
    Issued(ArtifactPaths),
    /// Certificate still valid, tool declined to renew
    AlreadyValid(String),
    /// Tool error, unrecognized stderr, or publication failure
    Failed(String),
}

impl IssuanceOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, IssuanceOutcome::Failed(_))
    }
}

impl fmt::Display for IssuanceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssuanceOutcome::Issued(paths) => write!(
                f,
                "issued (cert {}, key {})",
                paths.cert.display(),
                paths.key.display()
            ),
            IssuanceOutcome::AlreadyValid(reason) => write!(f, "already valid: {}", reason),
            IssuanceOutcome::Failed(detail) => write!(f, "failed: {}", detail),
        }
    }
}
