//! Trigger layer - what starts a pass
//!
//! Triggers flow through a channel with room for exactly one pending pass,
//! drained by a single worker. A trigger that arrives while a pass is
//! running and another is already queued is dropped with a log line, so
//! passes never overlap and bursts collapse into one follow-up pass.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::daemon::orchestrator::Orchestrator;
use crate::error::{Result, WardenError};
use crate::issue::Issuer;
use crate::verify::Reachability;

/// Why a pass was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Startup,
    Schedule,
    DomainsChanged,
    Manual,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TriggerKind::Startup => "startup",
            TriggerKind::Schedule => "schedule",
            TriggerKind::DomainsChanged => "domain list changed",
            TriggerKind::Manual => "manual",
        };
        write!(f, "{}", label)
    }
}

/// Sending half of the trigger channel
#[derive(Debug, Clone)]
pub struct TriggerSender {
    tx: mpsc::Sender<TriggerKind>,
}

impl TriggerSender {
    /// Queue a pass; returns false if it was dropped.
    pub fn fire(&self, kind: TriggerKind) -> bool {
        match self.tx.try_send(kind) {
            Ok(()) => {
                debug!("Queued pass ({})", kind);
                true
            }
            Err(TrySendError::Full(_)) => {
                info!("Trigger ({}) dropped: a pass is already pending", kind);
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Trigger ({}) dropped: pass worker has stopped", kind);
                false
            }
        }
    }
}

/// Channel holding at most one pending trigger
pub fn trigger_channel() -> (TriggerSender, mpsc::Receiver<TriggerKind>) {
    let (tx, rx) = mpsc::channel(1);
    (TriggerSender { tx }, rx)
}

/// Run passes until every sender is gone or `shutdown` turns true.
///
/// A pass already running when shutdown is requested finishes; a pending
/// trigger is discarded.
pub async fn run_worker<V, I>(
    orchestrator: Arc<Orchestrator<V, I>>,
    mut rx: mpsc::Receiver<TriggerKind>,
    mut shutdown: watch::Receiver<bool>,
) where
    V: Reachability,
    I: Issuer,
{
    loop {
        if *shutdown.borrow() {
            if let Ok(kind) = rx.try_recv() {
                info!("Pending pass ({}) discarded at shutdown", kind);
            }
            break;
        }
        let kind = tokio::select! {
            biased;
            changed = shutdown.changed() => match changed {
                Ok(()) => continue,
                Err(_) => break,
            },
            kind = rx.recv() => match kind {
                Some(kind) => kind,
                None => break,
            },
        };
        orchestrator.run_pass(kind).await;
    }
    debug!("Pass worker stopped");
}

/// Fire `Schedule` every `period`, starting one period from now.
pub fn spawn_schedule(sender: TriggerSender, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately; the startup pass covers it.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            info!("Running scheduled pass");
            sender.fire(TriggerKind::Schedule);
        }
    })
}

/// Watches the domain list and fires `DomainsChanged` on edits.
///
/// Dropping it stops the watch.
pub struct DomainsWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl Drop for DomainsWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Watch `path` for changes.
///
/// The parent directory is watched rather than the file itself, since many
/// editors save by writing a new file and renaming it over the old one.
/// Bursts of events within `debounce` collapse into one trigger.
pub fn watch_domains_file(path: &Path, sender: TriggerSender, debounce: Duration) -> Result<DomainsWatcher> {
    let file_name: OsString = path
        .file_name()
        .ok_or_else(|| WardenError::Watch(format!("{} has no file name", path.display())))?
        .to_os_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<()>();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if is_relevant(&event, &file_name) {
                    let _ = event_tx.send(());
                }
            }
            Err(e) => warn!("Domain list watch error: {}", e),
        },
        notify::Config::default(),
    )
    .map_err(|e| WardenError::Watch(format!("cannot create watcher: {}", e)))?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|e| WardenError::Watch(format!("cannot watch {}: {}", dir.display(), e)))?;

    let task = tokio::spawn(async move {
        while event_rx.recv().await.is_some() {
            tokio::time::sleep(debounce).await;
            while event_rx.try_recv().is_ok() {}
            info!("Detected changes in domain list, running pass");
            sender.fire(TriggerKind::DomainsChanged);
        }
    });

    info!("Watching {} for changes", path.display());
    Ok(DomainsWatcher {
        _watcher: watcher,
        task,
    })
}

fn is_relevant(event: &Event, file_name: &OsString) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}
