//! Sync command handlers

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use rentready_core::sync::{
    spawn_connectivity_watcher, spawn_reachability_probe, HttpRemote, ProbeTarget,
};
use rentready_core::{StorageKind, Store, SyncReport};

use crate::output::Output;

/// Build the remote client, or explain what is missing
fn remote_for(store: &Store) -> Result<HttpRemote> {
    let config = store.config();

    if !config.sync_enabled {
        bail!(
            "Sync is not enabled. Enable it with:\n  \
             rentready config set sync_enabled true\n  \
             rentready config set remote_url https://your-store.example.com"
        );
    }

    store.http_remote()?.ok_or_else(|| {
        anyhow!(
            "Remote URL not configured. Set it with:\n  \
             rentready config set remote_url https://your-store.example.com"
        )
    })
}

async fn drain(store: &Store, remote: HttpRemote) -> Result<SyncReport> {
    info!("Syncing with {}", remote.base_url());
    let report = store
        .sync_processor(Arc::new(remote))
        .process_sync_queue()
        .await
        .context("Failed to process sync queue")?;
    if !report.is_clean() {
        warn!(
            "{} of {} change(s) failed to sync",
            report.failed, report.attempted
        );
    }
    Ok(report)
}

/// Push queued changes to the remote store once
pub async fn sync(store: &Store, output: &Output) -> Result<()> {
    if store.kind() == StorageKind::Memory {
        output.message("Memory storage keeps no sync queue; nothing to sync.");
        return Ok(());
    }

    let remote = remote_for(store)?;
    output.message(&format!("Syncing with {}...", remote.base_url()));

    let report = drain(store, remote).await?;
    output.print_report(&report);
    Ok(())
}

/// Sync quietly (for auto-sync) - no output on success
pub async fn sync_quiet(store: &Store) -> Result<()> {
    if store.kind() == StorageKind::Memory {
        return Ok(());
    }
    let Some(remote) = store.http_remote()? else {
        return Ok(());
    };

    let report = drain(store, remote).await?;
    if report.failed > 0 {
        bail!("{} change(s) could not be synced and stay queued", report.failed);
    }
    Ok(())
}

/// Run until Ctrl-C, draining the queue whenever the remote store is reachable
pub async fn watch(store: &Store, output: &Output) -> Result<()> {
    if store.kind() == StorageKind::Memory {
        bail!("Memory storage keeps no sync queue; switch to sqlite to watch");
    }

    let remote = remote_for(store)?;
    let target = ProbeTarget::from_url(remote.base_url().as_str())
        .ok_or_else(|| anyhow!("Cannot probe remote URL: {}", remote.base_url()))?;

    let (events_tx, events_rx) = mpsc::channel(16);
    let processor = Arc::new(store.sync_processor(Arc::new(remote)));
    let watcher = spawn_connectivity_watcher(processor, events_rx);
    let probe =
        spawn_reachability_probe(target.clone(), store.config().probe_interval(), events_tx);

    output.message(&format!(
        "Watching {}:{} every {}s. Press Ctrl-C to stop.",
        target.host,
        target.port,
        store.config().probe_interval().as_secs()
    ));

    let mut state_rx = watcher.subscribe_state();
    let mut last_online = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let online = state_rx.borrow_and_update().is_online();
                if last_online == Some(online) {
                    continue;
                }
                last_online = Some(online);
                if online {
                    output.message("Remote store reachable");
                } else {
                    output.message("Remote store unreachable; changes stay queued");
                }
            }
        }
    }

    probe.shutdown().await;
    let triggered = watcher.syncs_triggered();
    watcher.shutdown().await;

    output.message(&format!(
        "Stopped. {} sync run(s) triggered, {} change(s) still queued.",
        triggered,
        store.pending_count()?
    ));
    Ok(())
}
