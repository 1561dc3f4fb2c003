//! Outbox sync
//!
//! Pushes locally queued changes to a remote document store.
//!
//! ## Flow
//!
//! 1. Every local write appends an entry to the `sync_queue` outbox
//! 2. The connectivity watcher waits for an online network event
//! 3. The sync processor replays the queue oldest first, removing each entry
//!    the remote store accepts
//!
//! ## Usage
//!
//! ```ignore
//! let remote = Arc::new(HttpRemote::new("https://store.example.com", timeout)?);
//! let processor = SyncProcessor::new(store.backend(), remote);
//! let report = processor.process_sync_queue().await?;
//! ```

mod connectivity;
mod processor;
mod remote;

pub use connectivity::{
    probe, spawn_connectivity_watcher, spawn_reachability_probe, NetworkState, ProbeHandle,
    ProbeTarget, WatcherHandle,
};
pub use processor::{apply_entry, SyncProcessor, SyncReport};
pub use remote::{HttpRemote, MemoryRemote, RemoteError, RemoteStore};
