//! Pass reports - what happened during one orchestration pass

use std::fmt;
use std::time::Duration;

use crate::daemon::trigger::TriggerKind;
use crate::domain::{CertificationDecision, DomainVerification, IssuanceOutcome};

/// Result of asking the orchestrator to run a pass
#[derive(Debug, Clone)]
pub enum PassStatus {
    /// Pass ran over the whole domain list
    Completed(PassReport),
    /// Domain list could not be loaded; nothing was processed
    Aborted(String),
    /// Another pass was in flight; nothing was done
    Busy,
}

impl PassStatus {
    pub fn report(&self) -> Option<&PassReport> {
        match self {
            PassStatus::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// Final state of one domain in a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainStatus {
    Issued,
    AlreadyValid,
    Failed,
    /// Base domain failed verification, no issuance attempted
    Unverified,
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DomainStatus::Issued => "issued",
            DomainStatus::AlreadyValid => "already valid",
            DomainStatus::Failed => "failed",
            DomainStatus::Unverified => "unverified",
        };
        write!(f, "{}", label)
    }
}

/// What happened to one domain entry
#[derive(Debug, Clone)]
pub struct DomainReport {
    pub domain: String,
    pub verification: DomainVerification,
    pub decision: Option<CertificationDecision>,
    pub outcome: Option<IssuanceOutcome>,
}

impl DomainReport {
    pub fn status(&self) -> DomainStatus {
        match &self.outcome {
            None => DomainStatus::Unverified,
            Some(IssuanceOutcome::Issued(_)) => DomainStatus::Issued,
            Some(IssuanceOutcome::AlreadyValid(_)) => DomainStatus::AlreadyValid,
            Some(IssuanceOutcome::Failed(_)) => DomainStatus::Failed,
        }
    }
}

/// Everything one pass did
#[derive(Debug, Clone)]
pub struct PassReport {
    pub trigger: TriggerKind,
    pub domains: Vec<DomainReport>,
    pub elapsed: Duration,
}

impl PassReport {
    pub fn new(trigger: TriggerKind) -> Self {
        Self {
            trigger,
            domains: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn count(&self, status: DomainStatus) -> usize {
        self.domains.iter().filter(|d| d.status() == status).count()
    }

    /// One-line summary for the log
    pub fn summary(&self) -> String {
        format!(
            "Pass ({}) finished in {:.1}s: {} domains, {} issued, {} already valid, {} failed, {} unverified",
            self.trigger,
            self.elapsed.as_secs_f64(),
            self.domains.len(),
            self.count(DomainStatus::Issued),
            self.count(DomainStatus::AlreadyValid),
            self.count(DomainStatus::Failed),
            self.count(DomainStatus::Unverified),
        )
    }
}
