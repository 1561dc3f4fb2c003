//! Storage layer
//!
//! The local store is the authoritative copy of items and rentals.
//!
//! ## Backends
//!
//! - **SQLite** (`SqliteBackend`): durable; every mutation also appends an
//!   entry to the `sync_queue` outbox in the same transaction.
//! - **Memory** (`MemoryBackend`): for platforms without persistent storage
//!   and for tests; nothing survives the process and nothing is queued.
//!
//! Both implement [`StorageBackend`] and are selected at composition time
//! with [`open_backend`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::models::{
    DashboardStats, Item, ItemStatus, ParseEnumError, Rental, SyncQueueEntry,
};

pub mod error;
pub mod memory;
pub mod outbox;
pub mod schema;
pub mod sqlite;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use sqlite::SqliteBackend;

/// Which backend to compose the store with
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Sqlite,
    Memory,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Sqlite => "sqlite",
            StorageKind::Memory => "memory",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sqlite" => Ok(StorageKind::Sqlite),
            "memory" => Ok(StorageKind::Memory),
            other => Err(ParseEnumError {
                kind: "storage backend",
                value: other.to_string(),
            }),
        }
    }
}

/// Local store operations shared by every backend
///
/// All writes are synchronous and durable (for the backend's notion of
/// durable) before they return. Reads return items with their derived
/// status (see [`ItemStatus::derive`]).
pub trait StorageBackend: Send + Sync {
    /// Which backend this is
    fn kind(&self) -> StorageKind;

    // ==================== Items ====================

    /// Insert a new item; fails with `Duplicate` if the id exists
    fn create_item(&self, item: &Item) -> StorageResult<()>;

    /// Overwrite the descriptive fields of an existing item.
    ///
    /// `item.status` is ignored: the stored status only changes through
    /// `set_item_status`, since reads report a derived status.
    fn update_item(&self, item: &Item) -> StorageResult<()>;

    /// Change only the stored status of an item
    fn set_item_status(&self, id: &str, status: ItemStatus) -> StorageResult<()>;

    fn delete_item(&self, id: &str) -> StorageResult<()>;

    fn get_item(&self, id: &str) -> StorageResult<Option<Item>>;

    /// All items in insertion order
    fn list_items(&self) -> StorageResult<Vec<Item>>;

    /// Distinct non-empty categories in order of first appearance
    fn list_categories(&self) -> StorageResult<Vec<String>>;

    // ==================== Rentals ====================

    fn create_rental(&self, rental: &Rental) -> StorageResult<()>;

    /// Mark a rental as returned
    fn complete_rental(&self, id: &str) -> StorageResult<()>;

    fn delete_rental(&self, id: &str) -> StorageResult<()>;

    fn get_rental(&self, id: &str) -> StorageResult<Option<Rental>>;

    /// All rentals in insertion order
    fn list_rentals(&self) -> StorageResult<Vec<Rental>>;

    /// Move every active rental due before `now` to overdue.
    /// Returns how many rentals changed.
    fn mark_overdue(&self, now: DateTime<Utc>) -> StorageResult<usize>;

    // ==================== Aggregates ====================

    fn dashboard_stats(&self) -> StorageResult<DashboardStats>;

    /// Insert the demo catalog if there are no items yet.
    /// Returns the number of items inserted; each one is queued as a create.
    fn seed_demo_catalog(&self) -> StorageResult<usize>;

    // ==================== Sync queue ====================

    /// Snapshot of queued changes, oldest first
    fn pending_changes(&self) -> StorageResult<Vec<SyncQueueEntry>>;

    /// Drop a queued change once the remote store has applied it
    fn remove_change(&self, id: i64) -> StorageResult<()>;

    fn pending_count(&self) -> StorageResult<usize>;
}

/// Open the backend selected by `config`
pub fn open_backend(config: &Config) -> StorageResult<Arc<dyn StorageBackend>> {
    match config.storage {
        StorageKind::Sqlite => Ok(Arc::new(SqliteBackend::open(&config.sqlite_path())?)),
        StorageKind::Memory => Ok(Arc::new(MemoryBackend::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RentalStatus, TimeUnit};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn backends() -> Vec<Box<dyn StorageBackend>> {
        vec![
            Box::new(SqliteBackend::open_in_memory().unwrap()),
            Box::new(MemoryBackend::new()),
        ]
    }

    fn run_scenario(store: &dyn StorageBackend) -> (Vec<Item>, Vec<Rental>, Vec<String>, DashboardStats) {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

        let tent = Item::with_id("tent", "Tent 4 Person", "Camping", 45_000.0).with_stock(4);
        let bag = Item::with_id("bag", "Sleeping Bag", "Camping", 15_000.0).with_stock(10);
        let lens = Item::with_id("lens", "50mm Lens", "Camera", 80_000.0);
        store.create_item(&tent).unwrap();
        store.create_item(&bag).unwrap();
        store.create_item(&lens).unwrap();
        store.set_item_status("lens", ItemStatus::Maintenance).unwrap();

        let mut r1 = Rental::checkout(&tent, "Sari", "staff", 2, 2, TimeUnit::Day, start).unwrap();
        r1.id = "r1".into();
        let mut r2 = Rental::checkout(&bag, "Dewi", "staff", 1, 5, TimeUnit::Hour, start).unwrap();
        r2.id = "r2".into();
        let mut r3 = Rental::checkout(&tent, "Andi", "staff", 1, 1, TimeUnit::Day, start).unwrap();
        r3.id = "r3".into();
        store.create_rental(&r1).unwrap();
        store.create_rental(&r2).unwrap();
        store.create_rental(&r3).unwrap();

        store.complete_rental("r2").unwrap();
        store
            .mark_overdue(Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap())
            .unwrap();

        (
            store.list_items().unwrap(),
            store.list_rentals().unwrap(),
            store.list_categories().unwrap(),
            store.dashboard_stats().unwrap(),
        )
    }

    #[test]
    fn test_backends_are_equivalent() {
        let results: Vec<_> = backends().iter().map(|b| run_scenario(b.as_ref())).collect();
        assert_eq!(results[0], results[1]);

        let (items, rentals, categories, stats) = &results[0];
        assert_eq!(categories, &vec!["Camping".to_string(), "Camera".to_string()]);

        let status_of = |id: &str| items.iter().find(|i| i.id == id).unwrap().status;
        assert_eq!(status_of("tent"), ItemStatus::Rented);
        assert_eq!(status_of("bag"), ItemStatus::Available);
        assert_eq!(status_of("lens"), ItemStatus::Maintenance);

        let status_of = |id: &str| rentals.iter().find(|r| r.id == id).unwrap().status;
        assert_eq!(status_of("r1"), RentalStatus::Active);
        assert_eq!(status_of("r2"), RentalStatus::Completed);
        assert_eq!(status_of("r3"), RentalStatus::Overdue);

        // 2 * 2 * 45000 + 5 * 0 + 45000
        assert_eq!(stats.total_revenue, 225_000.0);
        assert_eq!(stats.active_rentals, 2);
        assert_eq!(stats.late_rentals, 1);
    }

    #[test]
    fn test_missing_records_are_not_found_everywhere() {
        for store in backends() {
            let ghost = Item::with_id("ghost", "Ghost", "None", 1.0);
            assert!(matches!(
                store.update_item(&ghost),
                Err(StorageError::NotFound { table: "items", .. })
            ));
            assert!(matches!(
                store.complete_rental("nope"),
                Err(StorageError::NotFound { table: "rentals", .. })
            ));
            assert!(matches!(
                store.delete_rental("nope"),
                Err(StorageError::NotFound { .. })
            ));
            assert!(store.get_item("ghost").unwrap().is_none());
        }
    }

    #[test]
    fn test_duplicate_ids_rejected_everywhere() {
        for store in backends() {
            let item = Item::with_id("dup", "Lamp", "Lighting", 5.0);
            store.create_item(&item).unwrap();
            assert!(matches!(
                store.create_item(&item),
                Err(StorageError::Duplicate { table: "items", .. })
            ));
            assert_eq!(store.list_items().unwrap().len(), 1);
        }
    }

    #[test]
    fn test_seed_only_into_empty_store() {
        for store in backends() {
            assert_eq!(store.seed_demo_catalog().unwrap(), 4);
            assert_eq!(store.seed_demo_catalog().unwrap(), 0);
            assert_eq!(store.list_items().unwrap().len(), 4);
            let queued = match store.kind() {
                StorageKind::Sqlite => 4,
                StorageKind::Memory => 0,
            };
            assert_eq!(store.pending_count().unwrap(), queued);
        }
    }

    #[test]
    fn test_update_ignores_derived_status_everywhere() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        for store in backends() {
            let tent = Item::with_id("tent", "Tent 4 Person", "Camping", 45_000.0);
            store.create_item(&tent).unwrap();
            let mut rental = Rental::checkout(&tent, "Sari", "staff", 1, 1, TimeUnit::Day, start).unwrap();
            rental.id = "r1".into();
            store.create_rental(&rental).unwrap();

            let mut seen = store.get_item("tent").unwrap().unwrap();
            assert_eq!(seen.status, ItemStatus::Rented);
            seen.stock = 2;
            store.update_item(&seen).unwrap();

            store.complete_rental("r1").unwrap();
            let after = store.get_item("tent").unwrap().unwrap();
            assert_eq!(after.stock, 2);
            assert_eq!(after.status, ItemStatus::Available);
        }
    }

    #[test]
    fn test_open_backend_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config {
            data_dir: temp_dir.path().join("nested"),
            ..Config::default()
        };

        let sqlite = open_backend(&config).unwrap();
        assert_eq!(sqlite.kind(), StorageKind::Sqlite);
        assert!(config.sqlite_path().exists());

        config.storage = StorageKind::Memory;
        let memory = open_backend(&config).unwrap();
        assert_eq!(memory.kind(), StorageKind::Memory);
    }

    #[test]
    fn test_storage_kind_parse() {
        assert_eq!("memory".parse::<StorageKind>().unwrap(), StorageKind::Memory);
        assert!("postgres".parse::<StorageKind>().is_err());
    }
}
