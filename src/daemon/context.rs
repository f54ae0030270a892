//! Daemon context - wires the concrete components together
//!
//! DaemonContext owns the orchestrator built from configuration: system DNS
//! resolver, HTTP verifier, and the ACME client invoker with its publisher.

use std::future::Future;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::watch;

use crate::config::Config;
use crate::daemon::orchestrator::Orchestrator;
use crate::daemon::report::PassStatus;
use crate::daemon::trigger::{TriggerKind, run_worker, spawn_schedule, trigger_channel, watch_domains_file};
use crate::domain::DomainEntry;
use crate::error::Result;
use crate::issue::{IssuanceInvoker, Publisher};
use crate::loader::DomainSetLoader;
use crate::verify::{ReachabilityVerifier, SystemResolver};

/// Orchestrator over the real resolver and ACME client
pub type SystemOrchestrator = Orchestrator<ReachabilityVerifier<SystemResolver>, IssuanceInvoker>;

/// Shared context for the daemon and one-shot commands
pub struct DaemonContext {
    pub config: Config,
    pub orchestrator: Arc<SystemOrchestrator>,
}

impl DaemonContext {
    /// Build every component from configuration
    pub fn new(config: Config) -> Result<Self> {
        let resolver = SystemResolver::from_system_conf(config.challenge.dns_timeout())?;
        let verifier = Arc::new(ReachabilityVerifier::new(resolver, config.challenge.clone()));

        let publisher = Publisher::new(&config.acme.cert_home, &config.publish.target_root);
        let invoker = Arc::new(IssuanceInvoker::new(
            config.acme.clone(),
            publisher,
            config.transcript_path(),
        ));

        let loader = DomainSetLoader::new(&config.domains_file);
        let orchestrator = Arc::new(Orchestrator::new(loader, verifier, invoker));

        Ok(Self { config, orchestrator })
    }

    /// Read the domain list once; used as a startup sanity check
    pub fn load_domains(&self) -> Result<Vec<DomainEntry>> {
        self.orchestrator.loader().load()
    }

    /// Run a single pass now
    pub async fn run_once(&self) -> PassStatus {
        self.orchestrator.run_pass(TriggerKind::Manual).await
    }

    /// Run until `shutdown` resolves; an in-flight pass is allowed to finish,
    /// a pending one is not started
    pub async fn run_daemon(&self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let schedule = &self.config.schedule;
        let (sender, rx) = trigger_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let worker = tokio::spawn(run_worker(self.orchestrator.clone(), rx, stop_rx));

        if schedule.run_at_start {
            sender.fire(TriggerKind::Startup);
        }

        let ticker = spawn_schedule(sender.clone(), schedule.interval());
        info!("Scheduled passes every {}s", schedule.interval().as_secs());

        let watcher = if schedule.watch_domains_file {
            match watch_domains_file(&self.config.domains_file, sender.clone(), schedule.debounce()) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    warn!("Domain list changes will not trigger passes: {}", e);
                    None
                }
            }
        } else {
            None
        };

        shutdown.await;
        info!("Shutdown requested, waiting for the current pass to finish");

        let _ = stop_tx.send(true);
        ticker.abort();
        drop(watcher);
        drop(sender);
        let _ = ticker.await;

        if let Err(e) = worker.await {
            warn!("Pass worker ended abnormally: {}", e);
        }
        info!("Daemon stopped");
        Ok(())
    }
}
