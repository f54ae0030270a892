//! Verification Policy
//!
//! The base domain gates certification: it must pass on both stacks or
//! nothing is requested this pass. The www variant is only ever added, and
//! only when it independently passes both stacks.

use crate::domain::{CertificationDecision, DomainVerification};

/// Decide which subjects to certify for one domain, if any.
pub fn decide(results: &DomainVerification) -> Option<CertificationDecision> {
    if !results.base.passed() {
        return None;
    }

    if results.www.passed() {
        Some(CertificationDecision::with_www(
            results.base.domain.clone(),
            results.www.domain.clone(),
        ))
    } else {
        Some(CertificationDecision::single(results.base.domain.clone()))
    }
}
