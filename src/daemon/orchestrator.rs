//! Orchestrator - one pass over the domain list
//!
//! Per pass: load the list, then for each entry run the four reachability
//! checks concurrently, apply the policy, and issue when it allows. Entries
//! are processed one after another so the ACME client never runs twice at
//! once. A pass lock guarantees at most one pass in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use log::{error, info, warn};
use tokio::sync::Mutex;

use crate::daemon::report::{DomainReport, PassReport, PassStatus};
use crate::daemon::trigger::TriggerKind;
use crate::domain::{DomainEntry, DomainVerification};
use crate::issue::Issuer;
use crate::loader::DomainSetLoader;
use crate::policy;
use crate::verify::Reachability;

pub struct Orchestrator<V, I> {
    loader: DomainSetLoader,
    verifier: Arc<V>,
    issuer: Arc<I>,
    pass_lock: Mutex<()>,
    passes_completed: AtomicU64,
}

impl<V: Reachability, I: Issuer> Orchestrator<V, I> {
    pub fn new(loader: DomainSetLoader, verifier: Arc<V>, issuer: Arc<I>) -> Self {
        Self {
            loader,
            verifier,
            issuer,
            pass_lock: Mutex::new(()),
            passes_completed: AtomicU64::new(0),
        }
    }

    pub fn loader(&self) -> &DomainSetLoader {
        &self.loader
    }

    /// Whether a pass is in flight right now.
    pub fn is_busy(&self) -> bool {
        self.pass_lock.try_lock().is_err()
    }

    pub fn passes_completed(&self) -> u64 {
        self.passes_completed.load(Ordering::Relaxed)
    }

    /// Run one pass unless another is already running.
    pub async fn run_pass(&self, trigger: TriggerKind) -> PassStatus {
        let Ok(_guard) = self.pass_lock.try_lock() else {
            info!("Pass ({}) not started: another pass is running", trigger);
            return PassStatus::Busy;
        };

        let started = Instant::now();
        info!("Starting pass ({})", trigger);

        let entries = match self.loader.load() {
            Ok(entries) => entries,
            Err(e) => {
                error!("Pass ({}) aborted: {}", trigger, e);
                return PassStatus::Aborted(e.to_string());
            }
        };

        let mut report = PassReport::new(trigger);
        for entry in &entries {
            report.domains.push(self.process(entry).await);
        }
        report.elapsed = started.elapsed();

        self.passes_completed.fetch_add(1, Ordering::Relaxed);
        info!("{}", report.summary());
        PassStatus::Completed(report)
    }

    /// Check base and www over both stacks, all four concurrently.
    pub async fn verify_entry(&self, entry: &DomainEntry) -> DomainVerification {
        let www = entry.www();
        let (base, www) = futures::join!(
            self.verifier.verify(&entry.domain),
            self.verifier.verify(&www)
        );
        DomainVerification { base, www }
    }

    async fn process(&self, entry: &DomainEntry) -> DomainReport {
        info!("Starting verification for {} and {}", entry.domain, entry.www());

        let verification = self.verify_entry(entry).await;
        let decision = policy::decide(&verification);

        let outcome = match &decision {
            Some(decision) => Some(self.issuer.issue(decision).await),
            None => {
                warn!(
                    "Domain verification failed for {}: {}",
                    entry.domain, verification.base
                );
                None
            }
        };

        DomainReport {
            domain: entry.domain.clone(),
            verification,
            decision,
            outcome,
        }
    }
}
