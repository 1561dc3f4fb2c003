//! RentReady Core Library
//!
//! Offline-first inventory and rental tracking for a small rental shop.
//! Everything is written to a local store first; every write also lands in
//! an outbox that is replayed against a remote document store whenever the
//! device comes online.
//!
//! # Architecture
//!
//! - **Local store**: SQLite (or in-memory) backend, the authoritative copy
//! - **Outbox**: `sync_queue` table, appended in the same transaction as the
//!   write it records
//! - **Sync**: a processor that drains the outbox, started by a connectivity
//!   watcher on every online event
//!
//! # Quick Start
//!
//! ```text
//! let store = Store::open()?;
//!
//! let tent = Item::new("Tent 4 Person", "Camping", 45000.0).with_stock(10);
//! store.add_item(&tent)?;
//! store.rent_item(&tent.id, "Sari", "staff-1", 1, 3, TimeUnit::Day, Utc::now())?;
//!
//! let report = store.sync_processor(remote).process_sync_queue().await?;
//! ```
//!
//! # Modules
//!
//! - `store`: Unified storage interface (main entry point)
//! - `models`: Items, rentals and queue entries
//! - `calculator`: Rental cost and late penalty arithmetic
//! - `storage`: Local store backends, schema and outbox
//! - `sync`: Remote store, sync processor and connectivity watcher
//! - `config`: Application configuration

pub mod calculator;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod store;
pub mod sync;

pub use config::Config;
pub use error::{Error, Result};
pub use models::{DashboardStats, Item, ItemStatus, Rental, RentalStatus, SyncQueueEntry, TimeUnit};
pub use storage::{open_backend, StorageBackend, StorageError, StorageKind};
pub use store::Store;
pub use sync::{SyncProcessor, SyncReport};
