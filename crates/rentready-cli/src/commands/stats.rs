//! Dashboard and queue inspection

use anyhow::Result;

use rentready_core::Store;

use crate::output::Output;

/// Show dashboard totals and the number of unsynced changes
pub fn show(store: &Store, output: &Output) -> Result<()> {
    let stats = store.dashboard_stats()?;
    let pending = store.pending_count()?;
    output.print_stats(&stats, pending);
    Ok(())
}

/// List changes waiting to be synced, oldest first
pub fn queue(store: &Store, output: &Output) -> Result<()> {
    let entries = store.pending_changes()?;
    output.print_queue(&entries);
    Ok(())
}
