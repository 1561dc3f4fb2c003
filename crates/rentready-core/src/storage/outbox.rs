//! Sync queue (outbox) access
//!
//! Every local mutation appends one entry here inside the caller's
//! transaction, so a change is either both written and queued or neither.
//! Entries are only ever inserted and deleted, never updated.

use chrono::Utc;
use rusqlite::{params, Connection, Transaction};
use serde::Serialize;
use tracing::{debug, warn};

use super::error::StorageResult;
use crate::models::{SyncAction, SyncQueueEntry, SyncTable};

/// Append a change to the queue within `tx`.
///
/// The timestamp is the wall clock in milliseconds, clamped so it never
/// goes below the newest queued entry even if the clock steps backwards.
pub fn enqueue<T: Serialize + ?Sized>(
    tx: &Transaction<'_>,
    action: SyncAction,
    table: SyncTable,
    payload: &T,
) -> StorageResult<i64> {
    let data = serde_json::to_string(payload)?;

    let newest: i64 = tx.query_row(
        "SELECT COALESCE(MAX(timestamp), 0) FROM sync_queue",
        [],
        |row| row.get(0),
    )?;
    let timestamp = Utc::now().timestamp_millis().max(newest);

    tx.execute(
        "INSERT INTO sync_queue (action, table_name, data, timestamp) VALUES (?, ?, ?, ?)",
        params![action.as_str(), table.as_str(), data, timestamp],
    )?;

    let id = tx.last_insert_rowid();
    debug!(id, %action, %table, "Queued change");
    Ok(id)
}

/// All queued entries, oldest first
pub fn pending(conn: &Connection) -> StorageResult<Vec<SyncQueueEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, action, table_name, data, timestamp FROM sync_queue ORDER BY timestamp ASC, id ASC",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, Option<i64>>(4)?,
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, action, table, data, timestamp) = row?;

        // A row this version cannot interpret stays queued but must not
        // block the entries behind it.
        let action = match action.unwrap_or_default().parse::<SyncAction>() {
            Ok(action) => action,
            Err(e) => {
                warn!(id, error = %e, "Skipping unreadable queue entry");
                continue;
            }
        };
        let table = match table.unwrap_or_default().parse::<SyncTable>() {
            Ok(table) => table,
            Err(e) => {
                warn!(id, error = %e, "Skipping unreadable queue entry");
                continue;
            }
        };

        entries.push(SyncQueueEntry {
            id,
            action,
            table,
            data: data.unwrap_or_default(),
            timestamp: timestamp.unwrap_or(0),
        });
    }

    Ok(entries)
}

/// Delete one entry after the remote store confirmed it.
/// Deleting an id that is already gone is not an error.
pub fn remove(conn: &Connection, id: i64) -> StorageResult<()> {
    conn.execute("DELETE FROM sync_queue WHERE id = ?", params![id])?;
    Ok(())
}

/// Number of queued entries
pub fn count(conn: &Connection) -> StorageResult<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM sync_queue", [], |row| row.get(0))?;
    Ok(count as usize)
}
