//! Domain types for acmewarden
//!
//! This module contains the core data model:
//! - DomainEntry: one managed base domain, its www variant is derived
//! - VerificationResult / DomainVerification: dual-stack check results
//! - CertificationDecision: the subjects to request in one certificate
//! - IssuanceOutcome: result of one run of the external issuer

pub mod decision;
pub mod entry;
pub mod outcome;
pub mod verification;

pub use decision::CertificationDecision;
pub use entry::{DomainEntry, validate_hostname};
pub use outcome::{ArtifactPaths, IssuanceOutcome};
pub use verification::{DomainVerification, Stack, VerificationResult};
