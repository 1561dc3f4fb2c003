//! Unified storage interface
//!
//! The `Store` is what the presentation layer talks to. It owns the local
//! backend chosen by configuration and hands out sync processors that drain
//! the backend's outbox.
//!
//! ## Usage
//!
//! ```ignore
//! let store = Store::open()?;
//!
//! let item = Item::new("Tent 4 Person", "Camping", 45000.0);
//! store.add_item(&item)?;
//! let rental = store.rent_item(&item.id, "Sari", "staff-1", 1, 2, TimeUnit::Day, Utc::now())?;
//!
//! let processor = store.sync_processor(remote);
//! processor.process_sync_queue().await?;
//! ```

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::models::{DashboardStats, Item, ItemStatus, Rental, SyncQueueEntry, TimeUnit};
use crate::storage::{open_backend, StorageBackend, StorageKind};
use crate::sync::{HttpRemote, RemoteStore, SyncProcessor};

/// Unified storage interface for RentReady
pub struct Store {
    backend: Arc<dyn StorageBackend>,
    config: Config,
}

impl Store {
    /// Open the store described by the default configuration
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config)
    }

    /// Open the store with a specific configuration
    pub fn open_with_config(config: Config) -> Result<Self> {
        let backend = open_backend(&config).with_context(|| {
            format!("Failed to open {} store in {:?}", config.storage, config.data_dir)
        })?;
        Ok(Self { backend, config })
    }

    /// Wrap an already opened backend
    pub fn with_backend(backend: Arc<dyn StorageBackend>, config: Config) -> Self {
        Self { backend, config }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle to the backend, for sync processors
    pub fn backend(&self) -> Arc<dyn StorageBackend> {
        self.backend.clone()
    }

    pub fn kind(&self) -> StorageKind {
        self.backend.kind()
    }

    /// Check if this is a new store (no items or rentals yet)
    pub fn is_new(&self) -> bool {
        self.backend.list_items().map(|i| i.is_empty()).unwrap_or(false)
            && self.backend.list_rentals().map(|r| r.is_empty()).unwrap_or(false)
    }

    // ==================== Item Operations ====================

    pub fn add_item(&self, item: &Item) -> Result<()> {
        self.backend
            .create_item(item)
            .with_context(|| format!("Failed to add item '{}'", item.name))
    }

    pub fn update_item(&self, item: &Item) -> Result<()> {
        self.backend
            .update_item(item)
            .with_context(|| format!("Failed to update item '{}'", item.id))
    }

    pub fn set_item_status(&self, id: &str, status: ItemStatus) -> Result<()> {
        self.backend
            .set_item_status(id, status)
            .with_context(|| format!("Failed to set status of item '{}'", id))
    }

    pub fn delete_item(&self, id: &str) -> Result<()> {
        self.backend
            .delete_item(id)
            .with_context(|| format!("Failed to delete item '{}'", id))
    }

    pub fn get_item(&self, id: &str) -> Result<Option<Item>> {
        self.backend.get_item(id).context("Failed to get item")
    }

    pub fn get_all_items(&self) -> Result<Vec<Item>> {
        self.backend.list_items().context("Failed to list items")
    }

    /// Items whose category matches, case-insensitively
    pub fn get_items_by_category(&self, category: &str) -> Result<Vec<Item>> {
        Ok(self
            .get_all_items()?
            .into_iter()
            .filter(|i| i.category.eq_ignore_ascii_case(category))
            .collect())
    }

    pub fn get_categories(&self) -> Result<Vec<String>> {
        self.backend
            .list_categories()
            .context("Failed to list categories")
    }

    // ==================== Rental Operations ====================

    /// Check out `quantity` units of an item and record the rental
    #[allow(clippy::too_many_arguments)]
    pub fn rent_item(
        &self,
        item_id: &str,
        customer_name: &str,
        user_id: &str,
        quantity: u32,
        duration: u32,
        time_unit: TimeUnit,
        start: DateTime<Utc>,
    ) -> Result<Rental> {
        let item = self
            .get_item(item_id)?
            .ok_or_else(|| anyhow!("Item not found: {}", item_id))?;
        if item.status == ItemStatus::Maintenance {
            return Err(anyhow!("'{}' is under maintenance", item.name));
        }

        let rental = Rental::checkout(
            &item,
            customer_name,
            user_id,
            quantity,
            duration,
            time_unit,
            start,
        )?;
        self.add_rental(&rental)?;
        Ok(rental)
    }

    pub fn add_rental(&self, rental: &Rental) -> Result<()> {
        self.backend
            .create_rental(rental)
            .with_context(|| format!("Failed to record rental for '{}'", rental.customer_name))
    }

    pub fn complete_rental(&self, id: &str) -> Result<()> {
        self.backend
            .complete_rental(id)
            .with_context(|| format!("Failed to complete rental '{}'", id))
    }

    pub fn delete_rental(&self, id: &str) -> Result<()> {
        self.backend
            .delete_rental(id)
            .with_context(|| format!("Failed to delete rental '{}'", id))
    }

    pub fn get_rental(&self, id: &str) -> Result<Option<Rental>> {
        self.backend.get_rental(id).context("Failed to get rental")
    }

    pub fn get_all_rentals(&self) -> Result<Vec<Rental>> {
        self.backend.list_rentals().context("Failed to list rentals")
    }

    /// Move active rentals past their end date to overdue
    pub fn mark_overdue(&self, now: DateTime<Utc>) -> Result<usize> {
        self.backend
            .mark_overdue(now)
            .context("Failed to mark overdue rentals")
    }

    // ==================== Aggregates ====================

    pub fn dashboard_stats(&self) -> Result<DashboardStats> {
        self.backend
            .dashboard_stats()
            .context("Failed to compute dashboard stats")
    }

    /// Insert the demo catalog into an empty store
    pub fn seed_demo_catalog(&self) -> Result<usize> {
        self.backend
            .seed_demo_catalog()
            .context("Failed to seed demo catalog")
    }

    // ==================== Sync ====================

    pub fn pending_changes(&self) -> Result<Vec<SyncQueueEntry>> {
        self.backend
            .pending_changes()
            .context("Failed to read sync queue")
    }

    pub fn pending_count(&self) -> Result<usize> {
        self.backend
            .pending_count()
            .context("Failed to count sync queue")
    }

    /// A processor draining this store's queue into `remote`
    pub fn sync_processor(&self, remote: Arc<dyn RemoteStore>) -> SyncProcessor {
        SyncProcessor::new(self.backend.clone(), remote)
    }

    /// HTTP remote built from `remote_url`, if one is configured
    pub fn http_remote(&self) -> Result<Option<HttpRemote>> {
        match self.config.remote_url.as_deref() {
            Some(url) if !url.is_empty() => {
                let remote = HttpRemote::new(url, self.config.request_timeout())
                    .context("Failed to create remote store client")?;
                Ok(Some(remote))
            }
            _ => Ok(None),
        }
    }
}
