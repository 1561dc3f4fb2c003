//! Sync queue processor
//!
//! Drains the local outbox into the remote store. One invocation takes a
//! snapshot of the queue and walks it oldest first; every entry is attempted
//! exactly once and a failure never stops the entries behind it.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::remote::{RemoteError, RemoteStore};
use crate::models::{SyncAction, SyncQueueEntry};
use crate::storage::{StorageBackend, StorageResult};

/// Outcome of one drain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Entries in the snapshot
    pub attempted: usize,
    /// Entries applied remotely and removed from the queue
    pub applied: usize,
    /// Entries left queued for the next drain
    pub failed: usize,
    /// Queue length after the drain
    pub remaining: usize,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Replays queued local changes against a remote store
pub struct SyncProcessor {
    store: Arc<dyn StorageBackend>,
    remote: Arc<dyn RemoteStore>,
}

impl SyncProcessor {
    pub fn new(store: Arc<dyn StorageBackend>, remote: Arc<dyn RemoteStore>) -> Self {
        Self { store, remote }
    }

    /// Drain the current queue snapshot once.
    ///
    /// Fails only when the queue itself cannot be read; per-entry failures
    /// are logged and counted in the report.
    pub async fn process_sync_queue(&self) -> StorageResult<SyncReport> {
        let queue = self.store.pending_changes()?;
        let mut report = SyncReport {
            attempted: queue.len(),
            ..SyncReport::default()
        };

        if queue.is_empty() {
            debug!("Sync queue is empty");
            return Ok(report);
        }

        for entry in &queue {
            match apply_entry(self.remote.as_ref(), entry).await {
                Ok(()) => match self.store.remove_change(entry.id) {
                    Ok(()) => report.applied += 1,
                    Err(e) => {
                        // Applied but still queued; the next drain repeats it
                        warn!(entry = entry.id, error = %e, "Failed to dequeue applied change");
                        report.failed += 1;
                    }
                },
                Err(e) => {
                    warn!(
                        entry = entry.id,
                        action = %entry.action,
                        table = %entry.table,
                        error = %e,
                        "Failed to apply queued change"
                    );
                    report.failed += 1;
                }
            }
        }

        report.remaining = self.store.pending_count()?;
        info!(
            attempted = report.attempted,
            applied = report.applied,
            failed = report.failed,
            remaining = report.remaining,
            "Sync queue drained"
        );
        Ok(report)
    }
}

/// Apply a single queued change to the remote store
pub async fn apply_entry(remote: &dyn RemoteStore, entry: &SyncQueueEntry) -> Result<(), RemoteError> {
    let payload = entry
        .payload()
        .map_err(|e| RemoteError::MalformedPayload(e.to_string()))?;
    let id = payload
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| RemoteError::MalformedPayload("payload has no string \"id\"".into()))?
        .to_string();

    match entry.action {
        SyncAction::Create => remote.upsert(entry.table, &id, &payload).await,
        SyncAction::Update => remote.merge(entry.table, &id, &payload).await,
        SyncAction::Delete => remote.delete(entry.table, &id).await,
    }
}
