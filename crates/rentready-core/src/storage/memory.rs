//! In-memory backend
//!
//! Same read and write semantics as the SQLite backend, minus durability.
//! There is no sync queue: changes made here are never pushed anywhere.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::error::{StorageError, StorageResult};
use super::{StorageBackend, StorageKind};
use crate::models::{
    demo_catalog, DashboardStats, Item, ItemStatus, Rental, RentalStatus, SyncQueueEntry,
};

#[derive(Default)]
struct State {
    items: Vec<Item>,
    rentals: Vec<Rental>,
}

impl State {
    fn with_derived_status(&self, item: &Item) -> Item {
        let has_open_rental = self
            .rentals
            .iter()
            .any(|r| r.item_id == item.id && r.status.is_open());
        let mut item = item.clone();
        item.status = ItemStatus::derive(item.status, has_open_rental);
        item
    }

    fn item_mut(&mut self, id: &str) -> StorageResult<&mut Item> {
        self.items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| StorageError::NotFound {
                table: "items",
                id: id.to_string(),
            })
    }

    fn rental_mut(&mut self, id: &str) -> StorageResult<&mut Rental> {
        self.rentals
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StorageError::NotFound {
                table: "rentals",
                id: id.to_string(),
            })
    }
}

/// Volatile store for platforms without persistent storage
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> StorageResult<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl StorageBackend for MemoryBackend {
    fn kind(&self) -> StorageKind {
        StorageKind::Memory
    }

    fn create_item(&self, item: &Item) -> StorageResult<()> {
        let mut state = self.state()?;
        if state.items.iter().any(|i| i.id == item.id) {
            return Err(StorageError::Duplicate {
                table: "items",
                id: item.id.clone(),
            });
        }
        state.items.push(item.clone());
        Ok(())
    }

    fn update_item(&self, item: &Item) -> StorageResult<()> {
        let mut state = self.state()?;
        let stored = state.item_mut(&item.id)?;
        *stored = Item {
            status: stored.status,
            ..item.clone()
        };
        Ok(())
    }

    fn set_item_status(&self, id: &str, status: ItemStatus) -> StorageResult<()> {
        let mut state = self.state()?;
        state.item_mut(id)?.status = status;
        Ok(())
    }

    fn delete_item(&self, id: &str) -> StorageResult<()> {
        let mut state = self.state()?;
        state.item_mut(id)?;
        state.items.retain(|i| i.id != id);
        Ok(())
    }

    fn get_item(&self, id: &str) -> StorageResult<Option<Item>> {
        let state = self.state()?;
        Ok(state
            .items
            .iter()
            .find(|i| i.id == id)
            .map(|i| state.with_derived_status(i)))
    }

    fn list_items(&self) -> StorageResult<Vec<Item>> {
        let state = self.state()?;
        Ok(state
            .items
            .iter()
            .map(|i| state.with_derived_status(i))
            .collect())
    }

    fn list_categories(&self) -> StorageResult<Vec<String>> {
        let state = self.state()?;
        let mut categories: Vec<String> = Vec::new();
        for item in &state.items {
            if !item.category.is_empty() && !categories.contains(&item.category) {
                categories.push(item.category.clone());
            }
        }
        Ok(categories)
    }

    fn create_rental(&self, rental: &Rental) -> StorageResult<()> {
        let mut state = self.state()?;
        if state.rentals.iter().any(|r| r.id == rental.id) {
            return Err(StorageError::Duplicate {
                table: "rentals",
                id: rental.id.clone(),
            });
        }
        state.rentals.push(rental.clone());
        Ok(())
    }

    fn complete_rental(&self, id: &str) -> StorageResult<()> {
        let mut state = self.state()?;
        state.rental_mut(id)?.status = RentalStatus::Completed;
        Ok(())
    }

    fn delete_rental(&self, id: &str) -> StorageResult<()> {
        let mut state = self.state()?;
        state.rental_mut(id)?;
        state.rentals.retain(|r| r.id != id);
        Ok(())
    }

    fn get_rental(&self, id: &str) -> StorageResult<Option<Rental>> {
        let state = self.state()?;
        Ok(state.rentals.iter().find(|r| r.id == id).cloned())
    }

    fn list_rentals(&self) -> StorageResult<Vec<Rental>> {
        Ok(self.state()?.rentals.clone())
    }

    fn mark_overdue(&self, now: DateTime<Utc>) -> StorageResult<usize> {
        let mut state = self.state()?;
        let mut changed = 0;
        for rental in state.rentals.iter_mut().filter(|r| r.is_past_due(now)) {
            rental.status = RentalStatus::Overdue;
            changed += 1;
        }
        Ok(changed)
    }

    fn dashboard_stats(&self) -> StorageResult<DashboardStats> {
        let state = self.state()?;
        Ok(DashboardStats {
            total_revenue: state.rentals.iter().map(|r| r.total_cost).sum(),
            active_rentals: state.rentals.iter().filter(|r| r.status.is_open()).count() as i64,
            late_rentals: state
                .rentals
                .iter()
                .filter(|r| r.status == RentalStatus::Overdue)
                .count() as i64,
        })
    }

    fn seed_demo_catalog(&self) -> StorageResult<usize> {
        let mut state = self.state()?;
        if !state.items.is_empty() {
            return Ok(0);
        }
        state.items = demo_catalog();
        Ok(state.items.len())
    }

    fn pending_changes(&self) -> StorageResult<Vec<SyncQueueEntry>> {
        Ok(Vec::new())
    }

    fn remove_change(&self, _id: i64) -> StorageResult<()> {
        Ok(())
    }

    fn pending_count(&self) -> StorageResult<usize> {
        Ok(0)
    }
}
