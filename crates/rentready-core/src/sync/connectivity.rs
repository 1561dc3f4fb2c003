//! Connectivity watcher
//!
//! Listens to network-state events and starts a queue drain each time the
//! device reports that it is connected and the internet is reachable.
//!
//! ## Usage
//!
//! ```ignore
//! let (events_tx, events_rx) = mpsc::channel(16);
//! let watcher = spawn_connectivity_watcher(processor, events_rx);
//! let probe = spawn_reachability_probe(target, interval, events_tx);
//! // ...
//! probe.shutdown().await;
//! watcher.shutdown().await;
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use super::processor::{SyncProcessor, SyncReport};
use crate::storage::StorageResult;

/// Network state as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkState {
    /// Attached to some network
    pub connected: bool,
    /// The wider internet answers
    pub internet_reachable: bool,
}

impl NetworkState {
    pub const ONLINE: NetworkState = NetworkState {
        connected: true,
        internet_reachable: true,
    };

    pub const OFFLINE: NetworkState = NetworkState {
        connected: false,
        internet_reachable: false,
    };

    pub fn is_online(&self) -> bool {
        self.connected && self.internet_reachable
    }
}

/// Commands sent to a background task
#[derive(Debug)]
enum Command {
    Shutdown,
}

/// Handle to a running connectivity watcher
pub struct WatcherHandle {
    command_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<NetworkState>,
    syncs_triggered: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Last state the watcher observed
    pub fn network_state(&self) -> NetworkState {
        *self.state_rx.borrow()
    }

    /// Watch state changes
    pub fn subscribe_state(&self) -> watch::Receiver<NetworkState> {
        self.state_rx.clone()
    }

    /// Number of drains started so far
    pub fn syncs_triggered(&self) -> usize {
        self.syncs_triggered.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop listening and wait for in-flight drains to finish.
    ///
    /// Events already queued on the channel are handled first.
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(Command::Shutdown).await;
        if let Err(e) = self.task.await {
            warn!("Connectivity watcher ended abnormally: {}", e);
        }
    }
}

/// Spawn the watcher task.
///
/// The task ends on [`WatcherHandle::shutdown`] or when every sender of
/// `events` has been dropped, after waiting for the drains it started.
pub fn spawn_connectivity_watcher(
    processor: Arc<SyncProcessor>,
    events: mpsc::Receiver<NetworkState>,
) -> WatcherHandle {
    let (command_tx, command_rx) = mpsc::channel(4);
    let (state_tx, state_rx) = watch::channel(NetworkState::default());
    let syncs_triggered = Arc::new(AtomicUsize::new(0));

    let task = tokio::spawn(watcher_loop(
        processor,
        events,
        command_rx,
        state_tx,
        syncs_triggered.clone(),
    ));

    WatcherHandle {
        command_tx,
        state_rx,
        syncs_triggered,
        task,
    }
}

async fn watcher_loop(
    processor: Arc<SyncProcessor>,
    mut events: mpsc::Receiver<NetworkState>,
    mut command_rx: mpsc::Receiver<Command>,
    state_tx: watch::Sender<NetworkState>,
    syncs_triggered: Arc<AtomicUsize>,
) {
    let mut drains: JoinSet<StorageResult<SyncReport>> = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            event = events.recv() => {
                let Some(state) = event else {
                    debug!("Network event source closed");
                    break;
                };
                state_tx.send_replace(state);

                if state.is_online() {
                    syncs_triggered.fetch_add(1, Ordering::SeqCst);
                    debug!("Online, draining sync queue");
                    let processor = processor.clone();
                    drains.spawn(async move { processor.process_sync_queue().await });
                } else {
                    debug!(?state, "Offline, sync deferred");
                }
            }
            cmd = command_rx.recv() => {
                if matches!(cmd, Some(Command::Shutdown) | None) {
                    break;
                }
            }
            Some(joined) = drains.join_next(), if !drains.is_empty() => {
                log_drain(joined);
            }
        }
    }

    while let Some(joined) = drains.join_next().await {
        log_drain(joined);
    }
    info!("Connectivity watcher stopped");
}

fn log_drain(joined: Result<StorageResult<SyncReport>, tokio::task::JoinError>) {
    match joined {
        Ok(Ok(report)) if !report.is_clean() => {
            warn!(failed = report.failed, remaining = report.remaining, "Drain left changes queued")
        }
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!("Could not read sync queue: {}", e),
        Err(e) => warn!("Drain task failed: {}", e),
    }
}

// ==================== Reachability probe ====================

/// Host and port the probe dials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub host: String,
    pub port: u16,
}

impl ProbeTarget {
    /// Derive the target from the remote store URL
    pub fn from_url(remote_url: &str) -> Option<Self> {
        let url = Url::parse(remote_url).ok()?;
        Some(Self {
            host: url.host_str()?.to_string(),
            port: url.port_or_known_default()?,
        })
    }
}

/// Probe once: name resolution means connected, a TCP handshake means reachable
pub async fn probe(target: &ProbeTarget, timeout: Duration) -> NetworkState {
    let resolved = tokio::time::timeout(
        timeout,
        tokio::net::lookup_host((target.host.as_str(), target.port)),
    )
    .await;
    let addrs: Vec<_> = match resolved {
        Ok(Ok(addrs)) => addrs.collect(),
        _ => return NetworkState::OFFLINE,
    };
    if addrs.is_empty() {
        return NetworkState::OFFLINE;
    }

    let reachable = matches!(
        tokio::time::timeout(timeout, TcpStream::connect(&addrs[..])).await,
        Ok(Ok(_))
    );

    NetworkState {
        connected: true,
        internet_reachable: reachable,
    }
}

/// Handle to a running reachability probe
pub struct ProbeHandle {
    command_tx: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl ProbeHandle {
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(Command::Shutdown).await;
        if let Err(e) = self.task.await {
            warn!("Reachability probe ended abnormally: {}", e);
        }
    }
}

/// Spawn a task that probes `target` every `interval` and reports each result.
///
/// Every online result is forwarded, so a watcher listening on `events_tx`
/// retries the queue once per interval while online.
pub fn spawn_reachability_probe(
    target: ProbeTarget,
    interval: Duration,
    events_tx: mpsc::Sender<NetworkState>,
) -> ProbeHandle {
    let (command_tx, command_rx) = mpsc::channel(4);
    let task = tokio::spawn(probe_loop(target, interval, command_rx, events_tx));
    ProbeHandle { command_tx, task }
}

async fn probe_loop(
    target: ProbeTarget,
    interval: Duration,
    mut command_rx: mpsc::Receiver<Command>,
    events_tx: mpsc::Sender<NetworkState>,
) {
    let timeout = interval.min(Duration::from_secs(5));
    let mut last: Option<NetworkState> = None;

    loop {
        let state = probe(&target, timeout).await;
        if last != Some(state) {
            info!(host = %target.host, port = target.port, online = state.is_online(), "Network state changed");
            last = Some(state);
        }
        if events_tx.send(state).await.is_err() {
            // Watcher is gone
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            cmd = command_rx.recv() => {
                if matches!(cmd, Some(Command::Shutdown) | None) {
                    break;
                }
            }
        }
    }
}
