//! SQLite backend
//!
//! Durable store for items and rentals. Each mutation runs in one
//! transaction that also appends its outbox entry, so a failed write never
//! leaves a queued change behind and a committed write is always queued.
//!
//! ## Tables
//!
//! - `items` - Item records
//! - `rentals` - Rental records (`synced` column is legacy and unused)
//! - `sync_queue` - Pending changes for the remote store

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde_json::json;
use tracing::{debug, info};

use super::error::{StorageError, StorageResult};
use super::outbox;
use super::schema::{has_legacy_layout, init_schema, needs_init};
use super::{StorageBackend, StorageKind};
use crate::calculator::parse_date;
use crate::models::{
    demo_catalog, DashboardStats, Item, ItemStatus, Rental, RentalStatus, SyncAction,
    SyncQueueEntry, SyncTable, TimeUnit,
};

const ITEM_SELECT: &str = r#"
    SELECT CAST(i.id AS TEXT), i.name, i.category, i.pricePerDay, i.pricePerHour, i.stock, i.status,
           i.description, i.imageUrl,
           EXISTS(
               SELECT 1 FROM rentals r
               WHERE CAST(r.itemId AS TEXT) = CAST(i.id AS TEXT) AND COALESCE(r.status, 'active') IN ('active', 'overdue')
           )
    FROM items i
"#;

const RENTAL_SELECT: &str = r#"
    SELECT CAST(id AS TEXT), CAST(itemId AS TEXT), itemName, userId, customerName, startDate, endDate, totalCost,
           quantity, duration, timeUnit, status
    FROM rentals
"#;

/// SQLite-backed local store
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open or create the database at `path`, migrating older schemas
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::from_io(e, parent.to_path_buf()))?;
            }
        }

        let conn = Connection::open(path)?;
        debug!("Opened SQLite store at {:?}", path);
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> StorageResult<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        if needs_init(&conn) {
            let tx = conn.transaction()?;
            let legacy = has_legacy_layout(&tx)?;
            init_schema(&tx)?;
            if legacy {
                let queued = queue_existing_records(&tx)?;
                info!("Imported {} record(s) from the first-release schema", queued);
            }
            tx.commit()?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

// ==================== Row mapping ====================

/// Raw item row; every column may be NULL in databases from older releases
struct ItemRow {
    id: String,
    name: Option<String>,
    category: Option<String>,
    price_per_day: Option<f64>,
    price_per_hour: Option<f64>,
    stock: Option<i64>,
    status: Option<String>,
    description: Option<String>,
    image_url: Option<String>,
    has_open_rental: bool,
}

impl ItemRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            price_per_day: row.get(3)?,
            price_per_hour: row.get(4)?,
            stock: row.get(5)?,
            status: row.get(6)?,
            description: row.get(7)?,
            image_url: row.get(8)?,
            has_open_rental: row.get(9)?,
        })
    }

    /// The record with the status as stored
    fn into_stored_item(self) -> StorageResult<Item> {
        let stored = match self.status.as_deref() {
            None | Some("") => ItemStatus::Available,
            Some(s) => s.parse().map_err(|e: crate::models::ParseEnumError| {
                StorageError::InvalidRecord {
                    table: "items",
                    id: self.id.clone(),
                    details: e.to_string(),
                }
            })?,
        };

        Ok(Item {
            status: stored,
            name: self.name.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            price_per_day: self.price_per_day.unwrap_or(0.0),
            price_per_hour: self.price_per_hour.unwrap_or(0.0),
            stock: self.stock.unwrap_or(1).clamp(0, i64::from(u32::MAX)) as u32,
            description: self.description.unwrap_or_default(),
            image_url: self.image_url.unwrap_or_default(),
            id: self.id,
        })
    }

    /// The record as callers see it, with `Rented` derived from open rentals
    fn into_item(self) -> StorageResult<Item> {
        let has_open_rental = self.has_open_rental;
        let mut item = self.into_stored_item()?;
        item.status = ItemStatus::derive(item.status, has_open_rental);
        Ok(item)
    }
}

/// Raw rental row
struct RentalRow {
    id: String,
    item_id: Option<String>,
    item_name: Option<String>,
    user_id: Option<String>,
    customer_name: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    total_cost: Option<f64>,
    quantity: Option<i64>,
    duration: Option<i64>,
    time_unit: Option<String>,
    status: Option<String>,
}

impl RentalRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            item_id: row.get(1)?,
            item_name: row.get(2)?,
            user_id: row.get(3)?,
            customer_name: row.get(4)?,
            start_date: row.get(5)?,
            end_date: row.get(6)?,
            total_cost: row.get(7)?,
            quantity: row.get(8)?,
            duration: row.get(9)?,
            time_unit: row.get(10)?,
            status: row.get(11)?,
        })
    }

    fn into_rental(self) -> StorageResult<Rental> {
        let invalid = |details: String| StorageError::InvalidRecord {
            table: "rentals",
            id: self.id.clone(),
            details,
        };

        let time_unit = match self.time_unit.as_deref() {
            None | Some("") => TimeUnit::Day,
            Some(s) => s.parse().map_err(|e: crate::models::ParseEnumError| invalid(e.to_string()))?,
        };
        let status = match self.status.as_deref() {
            None | Some("") => RentalStatus::Active,
            Some(s) => s.parse().map_err(|e: crate::models::ParseEnumError| invalid(e.to_string()))?,
        };

        Ok(Rental {
            item_id: self.item_id.unwrap_or_default(),
            item_name: self.item_name.unwrap_or_default(),
            user_id: self.user_id.unwrap_or_default(),
            customer_name: self.customer_name.unwrap_or_default(),
            start_date: self.start_date.unwrap_or_default(),
            end_date: self.end_date.unwrap_or_default(),
            total_cost: self.total_cost.unwrap_or(0.0),
            quantity: positive_or_one(self.quantity),
            duration: positive_or_one(self.duration),
            time_unit,
            status,
            id: self.id,
        })
    }
}

fn positive_or_one(value: Option<i64>) -> u32 {
    match value {
        Some(v) if v >= 1 => v.min(i64::from(u32::MAX)) as u32,
        _ => 1,
    }
}

fn insert_item(conn: &Connection, item: &Item) -> StorageResult<()> {
    conn.execute(
        r#"
        INSERT INTO items (id, name, category, pricePerDay, pricePerHour, stock, status, description, imageUrl)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            item.id,
            item.name,
            item.category,
            item.price_per_day,
            item.price_per_hour,
            item.stock,
            item.status.as_str(),
            item.description,
            item.image_url,
        ],
    )
    .map_err(|e| StorageError::on_insert(e, "items", &item.id))?;
    Ok(())
}

fn item_rows(conn: &Connection) -> StorageResult<Vec<ItemRow>> {
    let sql = format!("{} ORDER BY i.rowid", ITEM_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], ItemRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn stored_item(conn: &Connection, id: &str) -> StorageResult<Option<Item>> {
    let sql = format!("{} WHERE i.id = ?", ITEM_SELECT);
    let row = conn
        .query_row(&sql, params![id], ItemRow::from_row)
        .optional()?;
    row.map(ItemRow::into_stored_item).transpose()
}

fn rentals(conn: &Connection) -> StorageResult<Vec<Rental>> {
    let sql = format!("{} ORDER BY rowid", RENTAL_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], RentalRow::from_row)?;

    let mut rentals = Vec::new();
    for row in rows {
        rentals.push(row?.into_rental()?);
    }
    Ok(rentals)
}

/// Queue a create for every record already in the tables
fn queue_existing_records(tx: &Transaction<'_>) -> StorageResult<usize> {
    let mut queued = 0;
    for row in item_rows(tx)? {
        outbox::enqueue(tx, SyncAction::Create, SyncTable::Items, &row.into_stored_item()?)?;
        queued += 1;
    }
    for rental in rentals(tx)? {
        outbox::enqueue(tx, SyncAction::Create, SyncTable::Rentals, &rental)?;
        queued += 1;
    }
    Ok(queued)
}

fn not_found(table: &'static str, id: &str) -> StorageError {
    StorageError::NotFound {
        table,
        id: id.to_string(),
    }
}

impl StorageBackend for SqliteBackend {
    fn kind(&self) -> StorageKind {
        StorageKind::Sqlite
    }

    // ==================== Items ====================

    fn create_item(&self, item: &Item) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        insert_item(&tx, item)?;
        outbox::enqueue(&tx, SyncAction::Create, SyncTable::Items, item)?;
        tx.commit()?;
        Ok(())
    }

    fn update_item(&self, item: &Item) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let changed = tx.execute(
            r#"
            UPDATE items
            SET name = ?, category = ?, pricePerDay = ?, pricePerHour = ?, stock = ?,
                description = ?, imageUrl = ?
            WHERE id = ?
            "#,
            params![
                item.name,
                item.category,
                item.price_per_day,
                item.price_per_hour,
                item.stock,
                item.description,
                item.image_url,
                item.id,
            ],
        )?;
        if changed == 0 {
            return Err(not_found("items", &item.id));
        }
        let stored = stored_item(&tx, &item.id)?.ok_or_else(|| not_found("items", &item.id))?;
        outbox::enqueue(&tx, SyncAction::Update, SyncTable::Items, &stored)?;
        tx.commit()?;
        Ok(())
    }

    fn set_item_status(&self, id: &str, status: ItemStatus) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE items SET status = ? WHERE id = ?",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(not_found("items", id));
        }
        outbox::enqueue(
            &tx,
            SyncAction::Update,
            SyncTable::Items,
            &json!({ "id": id, "status": status }),
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete_item(&self, id: &str) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let changed = tx.execute("DELETE FROM items WHERE id = ?", params![id])?;
        if changed == 0 {
            return Err(not_found("items", id));
        }
        outbox::enqueue(&tx, SyncAction::Delete, SyncTable::Items, &json!({ "id": id }))?;
        tx.commit()?;
        Ok(())
    }

    fn get_item(&self, id: &str) -> StorageResult<Option<Item>> {
        let conn = self.conn()?;
        let sql = format!("{} WHERE i.id = ?", ITEM_SELECT);
        let row = conn
            .query_row(&sql, params![id], ItemRow::from_row)
            .optional()?;
        row.map(ItemRow::into_item).transpose()
    }

    fn list_items(&self) -> StorageResult<Vec<Item>> {
        let conn = self.conn()?;
        item_rows(&conn)?.into_iter().map(ItemRow::into_item).collect()
    }

    fn list_categories(&self) -> StorageResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT category FROM items
            WHERE category IS NOT NULL AND category != ''
            GROUP BY category
            ORDER BY MIN(rowid)
            "#,
        )?;
        let categories = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(categories)
    }

    // ==================== Rentals ====================

    fn create_rental(&self, rental: &Rental) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO rentals (id, itemId, itemName, userId, customerName, startDate, endDate,
                                 totalCost, quantity, duration, timeUnit, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                rental.id,
                rental.item_id,
                rental.item_name,
                rental.user_id,
                rental.customer_name,
                rental.start_date,
                rental.end_date,
                rental.total_cost,
                rental.quantity,
                rental.duration,
                rental.time_unit.as_str(),
                rental.status.as_str(),
            ],
        )
        .map_err(|e| StorageError::on_insert(e, "rentals", &rental.id))?;
        outbox::enqueue(&tx, SyncAction::Create, SyncTable::Rentals, rental)?;
        tx.commit()?;
        Ok(())
    }

    fn complete_rental(&self, id: &str) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE rentals SET status = ? WHERE id = ?",
            params![RentalStatus::Completed.as_str(), id],
        )?;
        if changed == 0 {
            return Err(not_found("rentals", id));
        }
        outbox::enqueue(
            &tx,
            SyncAction::Update,
            SyncTable::Rentals,
            &json!({ "id": id, "status": RentalStatus::Completed }),
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete_rental(&self, id: &str) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let changed = tx.execute("DELETE FROM rentals WHERE id = ?", params![id])?;
        if changed == 0 {
            return Err(not_found("rentals", id));
        }
        outbox::enqueue(&tx, SyncAction::Delete, SyncTable::Rentals, &json!({ "id": id }))?;
        tx.commit()?;
        Ok(())
    }

    fn get_rental(&self, id: &str) -> StorageResult<Option<Rental>> {
        let conn = self.conn()?;
        let sql = format!("{} WHERE id = ?", RENTAL_SELECT);
        let row = conn
            .query_row(&sql, params![id], RentalRow::from_row)
            .optional()?;
        row.map(RentalRow::into_rental).transpose()
    }

    fn list_rentals(&self) -> StorageResult<Vec<Rental>> {
        let conn = self.conn()?;
        rentals(&conn)
    }

    fn mark_overdue(&self, now: DateTime<Utc>) -> StorageResult<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let due: Vec<String> = {
            let mut stmt = tx.prepare(
                "SELECT CAST(id AS TEXT), endDate FROM rentals WHERE COALESCE(status, 'active') = 'active' ORDER BY rowid",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })?;

            let mut due = Vec::new();
            for row in rows {
                let (id, end_date) = row?;
                let late = end_date
                    .as_deref()
                    .and_then(|end| parse_date(end).ok())
                    .is_some_and(|end| end < now);
                if late {
                    due.push(id);
                }
            }
            due
        };

        for id in &due {
            tx.execute(
                "UPDATE rentals SET status = ? WHERE id = ?",
                params![RentalStatus::Overdue.as_str(), id],
            )?;
            outbox::enqueue(
                &tx,
                SyncAction::Update,
                SyncTable::Rentals,
                &json!({ "id": id, "status": RentalStatus::Overdue }),
            )?;
        }

        tx.commit()?;
        if !due.is_empty() {
            debug!("Marked {} rental(s) overdue", due.len());
        }
        Ok(due.len())
    }

    // ==================== Aggregates ====================

    fn dashboard_stats(&self) -> StorageResult<DashboardStats> {
        let conn = self.conn()?;
        let stats = conn.query_row(
            r#"
            SELECT COALESCE(SUM(totalCost), 0),
                   COUNT(CASE WHEN COALESCE(status, 'active') IN ('active', 'overdue') THEN 1 END),
                   COUNT(CASE WHEN status = 'overdue' THEN 1 END)
            FROM rentals
            "#,
            [],
            |row| {
                Ok(DashboardStats {
                    total_revenue: row.get(0)?,
                    active_rentals: row.get(1)?,
                    late_rentals: row.get(2)?,
                })
            },
        )?;
        Ok(stats)
    }

    fn seed_demo_catalog(&self) -> StorageResult<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let existing: i64 = tx.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        if existing > 0 {
            return Ok(0);
        }

        let catalog = demo_catalog();
        for item in &catalog {
            insert_item(&tx, item)?;
            outbox::enqueue(&tx, SyncAction::Create, SyncTable::Items, item)?;
        }
        tx.commit()?;
        Ok(catalog.len())
    }

    // ==================== Sync queue ====================

    fn pending_changes(&self) -> StorageResult<Vec<SyncQueueEntry>> {
        let conn = self.conn()?;
        outbox::pending(&conn)
    }

    fn remove_change(&self, id: i64) -> StorageResult<()> {
        let conn = self.conn()?;
        outbox::remove(&conn, id)
    }

    fn pending_count(&self) -> StorageResult<usize> {
        let conn = self.conn()?;
        outbox::count(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::FIRST_RELEASE_FIXTURE;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn camera() -> Item {
        Item::with_id("cam-1", "Canon EOS R5", "Camera", 500_000.0)
            .with_price_per_hour(50_000.0)
            .with_stock(5)
            .with_description("Professional mirrorless camera")
    }

    fn rental_for(item: &Item, id: &str) -> Rental {
        let start = Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap();
        let mut rental =
            Rental::checkout(item, "Rina", "staff-1", 1, 2, TimeUnit::Day, start).unwrap();
        rental.id = id.to_string();
        rental
    }

    #[test]
    fn test_create_item_queues_one_snapshot() {
        let store = SqliteBackend::open_in_memory().unwrap();
        let item = camera();
        store.create_item(&item).unwrap();

        let queue = store.pending_changes().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].action, SyncAction::Create);
        assert_eq!(queue[0].table, SyncTable::Items);
        assert_eq!(
            queue[0].payload().unwrap(),
            serde_json::to_value(&item).unwrap()
        );

        assert_eq!(store.get_item("cam-1").unwrap().unwrap(), item);
    }

    #[test]
    fn test_failed_create_queues_nothing() {
        let store = SqliteBackend::open_in_memory().unwrap();
        let item = camera();
        store.create_item(&item).unwrap();

        let mut clash = camera();
        clash.name = "Other".into();
        assert!(store.create_item(&clash).is_err());

        assert_eq!(store.pending_count().unwrap(), 1);
        assert_eq!(store.get_item("cam-1").unwrap().unwrap().name, "Canon EOS R5");
    }

    #[test]
    fn test_update_and_status_changes_are_queued() {
        let store = SqliteBackend::open_in_memory().unwrap();
        let mut item = camera();
        store.create_item(&item).unwrap();

        item.price_per_day = 450_000.0;
        store.update_item(&item).unwrap();
        store
            .set_item_status("cam-1", ItemStatus::Maintenance)
            .unwrap();

        let queue = store.pending_changes().unwrap();
        let actions: Vec<_> = queue.iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![SyncAction::Create, SyncAction::Update, SyncAction::Update]
        );
        assert_eq!(queue[1].payload().unwrap()["pricePerDay"], 450_000.0);
        assert_eq!(
            queue[2].payload().unwrap(),
            json!({"id": "cam-1", "status": "maintenance"})
        );

        let stored = store.get_item("cam-1").unwrap().unwrap();
        assert_eq!(stored.status, ItemStatus::Maintenance);
    }

    #[test]
    fn test_update_missing_item_queues_nothing() {
        let store = SqliteBackend::open_in_memory().unwrap();
        assert!(store.update_item(&camera()).is_err());
        assert!(store.set_item_status("cam-1", ItemStatus::Rented).is_err());
        assert_eq!(store.pending_count().unwrap(), 0);
    }

    #[test]
    fn test_rental_lifecycle_is_queued() {
        let store = SqliteBackend::open_in_memory().unwrap();
        let item = camera();
        store.create_item(&item).unwrap();
        let rental = rental_for(&item, "r-1");
        store.create_rental(&rental).unwrap();

        assert_eq!(
            store.get_item("cam-1").unwrap().unwrap().status,
            ItemStatus::Rented
        );

        store.complete_rental("r-1").unwrap();
        assert_eq!(
            store.get_rental("r-1").unwrap().unwrap().status,
            RentalStatus::Completed
        );
        assert_eq!(
            store.get_item("cam-1").unwrap().unwrap().status,
            ItemStatus::Available
        );

        let queue = store.pending_changes().unwrap();
        assert_eq!(queue.len(), 3);
        assert_eq!(queue[1].table, SyncTable::Rentals);
        assert_eq!(
            queue[1].payload().unwrap(),
            serde_json::to_value(&rental).unwrap()
        );
        assert_eq!(
            queue[2].payload().unwrap(),
            json!({"id": "r-1", "status": "completed"})
        );
    }

    #[test]
    fn test_deletes_queue_delete_actions() {
        let store = SqliteBackend::open_in_memory().unwrap();
        let item = camera();
        store.create_item(&item).unwrap();
        store.create_rental(&rental_for(&item, "r-1")).unwrap();

        store.delete_rental("r-1").unwrap();
        store.delete_item("cam-1").unwrap();

        assert!(store.get_item("cam-1").unwrap().is_none());
        assert!(store.get_rental("r-1").unwrap().is_none());

        let queue = store.pending_changes().unwrap();
        let deletes: Vec<_> = queue
            .iter()
            .filter(|e| e.action == SyncAction::Delete)
            .map(|e| (e.table, e.payload().unwrap()))
            .collect();
        assert_eq!(
            deletes,
            vec![
                (SyncTable::Rentals, json!({"id": "r-1"})),
                (SyncTable::Items, json!({"id": "cam-1"})),
            ]
        );
    }

    #[test]
    fn test_mark_overdue_skips_unparseable_dates() {
        let store = SqliteBackend::open_in_memory().unwrap();
        let item = camera();
        store.create_item(&item).unwrap();

        let late = rental_for(&item, "late");
        let mut undated = rental_for(&item, "undated");
        undated.end_date = "N/A".into();
        store.create_rental(&late).unwrap();
        store.create_rental(&undated).unwrap();

        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(store.mark_overdue(now).unwrap(), 1);
        assert_eq!(store.mark_overdue(now).unwrap(), 0);

        assert_eq!(
            store.get_rental("late").unwrap().unwrap().status,
            RentalStatus::Overdue
        );
        assert_eq!(
            store.get_rental("undated").unwrap().unwrap().status,
            RentalStatus::Active
        );
        assert_eq!(store.dashboard_stats().unwrap().late_rentals, 1);
    }

    #[test]
    fn test_rows_missing_columns_read_with_defaults() {
        let store = SqliteBackend::open_in_memory().unwrap();
        {
            let conn = store.conn().unwrap();
            conn.execute(
                "INSERT INTO items (id, name, category, pricePerDay) VALUES ('old', 'Tripod', 'Camera', 20000)",
                [],
            )
            .unwrap();
            conn.execute(
                "UPDATE items SET stock = NULL, pricePerHour = NULL WHERE id = 'old'",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO rentals (id, itemId, customerName, startDate, endDate, totalCost) \
                 VALUES ('legacy', 'old', 'Joko', '2023-01-01', '2023-01-02', 20000)",
                [],
            )
            .unwrap();
            conn.execute(
                "UPDATE rentals SET quantity = NULL WHERE id = 'legacy'",
                [],
            )
            .unwrap();
        }

        let item = store.get_item("old").unwrap().unwrap();
        assert_eq!(item.stock, 1);
        assert_eq!(item.price_per_hour, 0.0);
        assert_eq!(item.description, "");
        assert_eq!(item.status, ItemStatus::Rented);

        let rental = store.get_rental("legacy").unwrap().unwrap();
        assert_eq!(rental.quantity, 1);
        assert_eq!(rental.duration, 1);
        assert_eq!(rental.time_unit, TimeUnit::Day);
        assert_eq!(rental.status, RentalStatus::Active);
        assert_eq!(rental.item_name, "");
    }

    #[test]
    fn test_data_persists_across_reopens() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data").join("rentready.db");

        {
            let store = SqliteBackend::open(&path).unwrap();
            let item = camera();
            store.create_item(&item).unwrap();
            store.create_rental(&rental_for(&item, "r-1")).unwrap();
        }

        let store = SqliteBackend::open(&path).unwrap();
        assert_eq!(store.list_items().unwrap().len(), 1);
        assert_eq!(store.list_rentals().unwrap().len(), 1);
        assert_eq!(store.pending_count().unwrap(), 2);
    }

    #[test]
    fn test_update_queues_stored_status() {
        let store = SqliteBackend::open_in_memory().unwrap();
        let item = camera();
        store.create_item(&item).unwrap();
        store.create_rental(&rental_for(&item, "r-1")).unwrap();

        let mut seen = store.get_item("cam-1").unwrap().unwrap();
        assert_eq!(seen.status, ItemStatus::Rented);
        seen.name = "Canon EOS R5 Kit".into();
        store.update_item(&seen).unwrap();

        let queue = store.pending_changes().unwrap();
        let payload = queue.last().unwrap().payload().unwrap();
        assert_eq!(payload["name"], "Canon EOS R5 Kit");
        assert_eq!(payload["status"], "available");

        store.complete_rental("r-1").unwrap();
        assert_eq!(
            store.get_item("cam-1").unwrap().unwrap().status,
            ItemStatus::Available
        );
    }

    #[test]
    fn test_seed_queues_creates() {
        let store = SqliteBackend::open_in_memory().unwrap();
        assert_eq!(store.seed_demo_catalog().unwrap(), 4);

        let queue = store.pending_changes().unwrap();
        assert_eq!(queue.len(), 4);
        assert!(queue.iter().all(|e| e.action == SyncAction::Create));
        assert_eq!(queue[0].payload().unwrap()["id"], "seed-1");
    }

    #[test]
    fn test_first_release_database_opens() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rentready.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch(FIRST_RELEASE_FIXTURE)
            .unwrap();

        let store = SqliteBackend::open(&path).unwrap();

        let items = store.list_items().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "1");
        assert_eq!(items[0].status, ItemStatus::Rented);
        assert_eq!(items[1].status, ItemStatus::Available);
        assert!(items[0].image_url.starts_with("https://"));

        let rentals = store.list_rentals().unwrap();
        let statuses: Vec<_> = rentals.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                RentalStatus::Active,
                RentalStatus::Completed,
                RentalStatus::Completed,
                RentalStatus::Overdue
            ]
        );
        assert_eq!(rentals[0].item_id, "1");
        assert_eq!(rentals[0].item_name, "Canon EOS R5");
        assert_eq!(store.get_rental("4").unwrap().unwrap().customer_name, "Ani");

        // Imported rows were never pushed anywhere
        let queue = store.pending_changes().unwrap();
        assert_eq!(queue.len(), 6);
        assert!(queue.iter().all(|e| e.action == SyncAction::Create));
        assert_eq!(queue[0].payload().unwrap()["status"], "available");

        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(store.mark_overdue(now).unwrap(), 1);
        store.create_item(&camera()).unwrap();
        drop(store);

        let store = SqliteBackend::open(&path).unwrap();
        assert_eq!(store.list_items().unwrap().len(), 3);
        assert_eq!(store.pending_count().unwrap(), 8);
        assert_eq!(store.dashboard_stats().unwrap().late_rentals, 2);
    }

    #[test]
    fn test_dashboard_stats_empty() {
        let store = SqliteBackend::open_in_memory().unwrap();
        assert_eq!(store.dashboard_stats().unwrap(), DashboardStats::default());
    }
}
