//! SQLite schema and migrations
//!
//! Columns are only ever renamed from their legacy snake_case names or added
//! with a default, so rows written before a column existed read back with the
//! documented default. Tables from the first release used INTEGER ids; those
//! are rebuilt once with TEXT ids.

use rusqlite::{Connection, Result};
use tracing::debug;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 3;

const ITEMS_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS {table} (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        category TEXT,
        pricePerDay REAL,
        pricePerHour REAL DEFAULT 0,
        stock INTEGER DEFAULT 1,
        status TEXT,
        description TEXT,
        imageUrl TEXT
    );
"#;

const RENTALS_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS {table} (
        id TEXT PRIMARY KEY,
        itemId TEXT,
        itemName TEXT,
        userId TEXT,
        customerName TEXT,
        startDate TEXT,
        endDate TEXT,
        totalCost REAL,
        quantity INTEGER DEFAULT 1,
        duration INTEGER,
        timeUnit TEXT,
        status TEXT,
        synced INTEGER DEFAULT 0
    );
"#;

/// Columns every `items` table must have besides `id` and `name`, with their DDL
const ITEM_COLUMNS: &[(&str, &str)] = &[
    ("category", "TEXT"),
    ("pricePerDay", "REAL"),
    ("pricePerHour", "REAL DEFAULT 0"),
    ("stock", "INTEGER DEFAULT 1"),
    ("status", "TEXT"),
    ("description", "TEXT"),
    ("imageUrl", "TEXT"),
];

/// Columns every `rentals` table must have besides `id`, with their DDL
const RENTAL_COLUMNS: &[(&str, &str)] = &[
    ("itemId", "TEXT"),
    ("itemName", "TEXT"),
    ("userId", "TEXT"),
    ("customerName", "TEXT"),
    ("startDate", "TEXT"),
    ("endDate", "TEXT"),
    ("totalCost", "REAL"),
    ("quantity", "INTEGER DEFAULT 1"),
    ("duration", "INTEGER"),
    ("timeUnit", "TEXT"),
    ("status", "TEXT"),
    // Deprecated: the sync queue decides what still needs pushing
    ("synced", "INTEGER DEFAULT 0"),
];

/// Column names used by the first release of the app
const LEGACY_RENAMES: &[(&str, &str, &str)] = &[
    ("items", "price_per_day", "pricePerDay"),
    ("items", "image_url", "imageUrl"),
    ("rentals", "item_id", "itemId"),
    ("rentals", "customer_name", "customerName"),
    ("rentals", "rental_date", "startDate"),
    ("rentals", "return_date", "endDate"),
    ("rentals", "total_cost", "totalCost"),
];

/// Initialize the database schema
///
/// Callers opening an existing file should run this inside a transaction so
/// a failed migration leaves the old tables untouched.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Outbox of local mutations waiting for the remote store
        CREATE TABLE IF NOT EXISTS sync_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            action TEXT,
            table_name TEXT,
            data TEXT,
            timestamp INTEGER
        );
        "#,
    )?;
    conn.execute_batch(&ITEMS_DDL.replace("{table}", "items"))?;
    conn.execute_batch(&RENTALS_DDL.replace("{table}", "rentals"))?;

    migrate(conn)?;

    // Created after migration so legacy column names are already fixed
    conn.execute_batch(
        r#"
        CREATE INDEX IF NOT EXISTS idx_rentals_item_status ON rentals(itemId, status);
        CREATE INDEX IF NOT EXISTS idx_sync_queue_order ON sync_queue(timestamp, id);
        "#,
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Whether `items` or `rentals` still has the first release's layout.
///
/// Rows in such tables were never queued for the remote store.
pub fn has_legacy_layout(conn: &Connection) -> Result<bool> {
    for table in ["items", "rentals"] {
        let columns = column_types(conn, table)?;
        let renamed = LEGACY_RENAMES
            .iter()
            .any(|(t, old, _)| *t == table && columns.iter().any(|(name, _)| name == old));
        if renamed || has_integer_ids(&columns, &["id"]) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Bring tables created by an older release up to the current shape
fn migrate(conn: &Connection) -> Result<()> {
    for (table, old, new) in LEGACY_RENAMES {
        let columns = table_columns(conn, table)?;
        if columns.iter().any(|c| c == old) && !columns.iter().any(|c| c == new) {
            debug!("Renaming legacy column {}.{} to {}", table, old, new);
            conn.execute_batch(&format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {};",
                table, old, new
            ))?;
        }
    }

    add_missing_columns(conn, "items", ITEM_COLUMNS)?;
    add_missing_columns(conn, "rentals", RENTAL_COLUMNS)?;

    rewrite_legacy_statuses(conn)?;

    // Rentals first: the legacy table holds a foreign key into items
    let mut rental_columns = vec!["id"];
    rental_columns.extend(RENTAL_COLUMNS.iter().map(|(name, _)| *name));
    rebuild_with_text_ids(conn, "rentals", RENTALS_DDL, &rental_columns, &["id", "itemId"])?;

    let mut item_columns = vec!["id", "name"];
    item_columns.extend(ITEM_COLUMNS.iter().map(|(name, _)| *name));
    rebuild_with_text_ids(conn, "items", ITEMS_DDL, &item_columns, &["id"])?;

    // Rentals from before the name snapshot existed
    let backfilled = conn.execute(
        "UPDATE rentals SET itemName = (SELECT name FROM items WHERE items.id = rentals.itemId) \
         WHERE itemName IS NULL",
        [],
    )?;
    if backfilled > 0 {
        debug!("Backfilled itemName on {} legacy rental(s)", backfilled);
    }

    Ok(())
}

/// Map `returned` and `late` onto the current rental statuses.
///
/// `late` was written both for open rentals past their end date and for
/// rentals returned late; a recorded return date tells them apart. Stored
/// `rented` on items is dropped because it is derived from open rentals.
fn rewrite_legacy_statuses(conn: &Connection) -> Result<()> {
    let late_becomes = if table_columns(conn, "rentals")?
        .iter()
        .any(|c| c == "actual_return_date")
    {
        "CASE WHEN actual_return_date IS NULL THEN 'overdue' ELSE 'completed' END"
    } else {
        "'overdue'"
    };

    let returned = conn.execute(
        "UPDATE rentals SET status = 'completed' WHERE status = 'returned'",
        [],
    )?;
    let late = conn.execute(
        &format!("UPDATE rentals SET status = {} WHERE status = 'late'", late_becomes),
        [],
    )?;
    let rented = conn.execute(
        "UPDATE items SET status = 'available' WHERE status = 'rented'",
        [],
    )?;
    if returned + late + rented > 0 {
        debug!("Rewrote {} legacy status value(s)", returned + late + rented);
    }
    Ok(())
}

fn has_integer_ids(columns: &[(String, String)], id_columns: &[&str]) -> bool {
    columns
        .iter()
        .any(|(name, ty)| id_columns.contains(&name.as_str()) && ty.eq_ignore_ascii_case("INTEGER"))
}

/// Recreate `table` with TEXT ids when an older release declared them INTEGER
fn rebuild_with_text_ids(
    conn: &Connection,
    table: &str,
    ddl: &str,
    columns: &[&str],
    id_columns: &[&str],
) -> Result<()> {
    if !has_integer_ids(&column_types(conn, table)?, id_columns) {
        return Ok(());
    }

    debug!("Rebuilding {} with TEXT ids", table);
    let rebuilt = format!("{}_rebuild", table);
    let select = columns
        .iter()
        .map(|c| {
            if id_columns.contains(c) {
                format!("CAST({} AS TEXT)", c)
            } else {
                c.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    conn.execute_batch(&ddl.replace("{table}", &rebuilt))?;
    conn.execute_batch(&format!(
        "INSERT INTO {rebuilt} ({column_list}) SELECT {select} FROM {table} ORDER BY rowid;
         DROP TABLE {table};
         ALTER TABLE {rebuilt} RENAME TO {table};",
        column_list = columns.join(", "),
    ))?;
    Ok(())
}

fn add_missing_columns(conn: &Connection, table: &str, wanted: &[(&str, &str)]) -> Result<()> {
    let existing = table_columns(conn, table)?;
    for (name, ddl) in wanted {
        if !existing.iter().any(|c| c == name) {
            debug!("Adding column {}.{}", table, name);
            conn.execute_batch(&format!("ALTER TABLE {} ADD COLUMN {} {};", table, name, ddl))?;
        }
    }
    Ok(())
}

/// Column names and declared types of a table, in declaration order
fn column_types(conn: &Connection, table: &str) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let columns = stmt
        .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))?
        .collect::<Result<Vec<_>>>()?;
    Ok(columns)
}

/// Column names of a table, in declaration order
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    Ok(column_types(conn, table)?
        .into_iter()
        .map(|(name, _)| name)
        .collect())
}

/// Tables exactly as the first release created them, with a few rows
#[cfg(test)]
pub(crate) const FIRST_RELEASE_FIXTURE: &str = r#"
    CREATE TABLE IF NOT EXISTS items (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      name TEXT NOT NULL,
      category TEXT NOT NULL,
      price_per_day REAL NOT NULL,
      status TEXT NOT NULL DEFAULT 'available',
      description TEXT,
      image_url TEXT
    );
    CREATE TABLE IF NOT EXISTS rentals (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      item_id INTEGER NOT NULL,
      customer_name TEXT NOT NULL,
      rental_date TEXT NOT NULL,
      return_date TEXT NOT NULL,
      actual_return_date TEXT,
      status TEXT NOT NULL DEFAULT 'active',
      total_cost REAL DEFAULT 0,
      FOREIGN KEY (item_id) REFERENCES items (id)
    );

    INSERT INTO items (name, category, price_per_day, status, description, image_url)
    VALUES ('Canon EOS R5', 'Camera', 500000, 'rented', 'Professional mirrorless camera',
            'https://images.unsplash.com/photo-1516035069371-29a1b244cc32');
    INSERT INTO items (name, category, price_per_day, status, description, image_url)
    VALUES ('Tent 4 Person', 'Camping', 45000, 'available', 'Spacious family tent', NULL);

    INSERT INTO rentals (item_id, customer_name, rental_date, return_date, actual_return_date, status, total_cost)
    VALUES (1, 'Sari', '2024-01-01T09:00:00.000Z', '2024-01-03T09:00:00.000Z', NULL, 'active', 1000000);
    INSERT INTO rentals (item_id, customer_name, rental_date, return_date, actual_return_date, status, total_cost)
    VALUES (2, 'Budi', '2023-12-01T09:00:00.000Z', '2023-12-02T09:00:00.000Z', '2023-12-02T08:00:00.000Z', 'returned', 45000);
    INSERT INTO rentals (item_id, customer_name, rental_date, return_date, actual_return_date, status, total_cost)
    VALUES (2, 'Joko', '2023-11-01T09:00:00.000Z', '2023-11-02T09:00:00.000Z', '2023-11-05T10:00:00.000Z', 'late', 45000);
    INSERT INTO rentals (item_id, customer_name, rental_date, return_date, actual_return_date, status, total_cost)
    VALUES (1, 'Ani', '2023-10-01T09:00:00.000Z', '2023-10-02T09:00:00.000Z', NULL, 'late', 500000);
"#;

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check if schema needs initialization or migration
pub fn needs_init(conn: &Connection) -> bool {
    let table_exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_info'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !table_exists {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_init_schema() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables = tables(&conn);
        assert!(tables.contains(&"items".to_string()));
        assert!(tables.contains(&"rentals".to_string()));
        assert!(tables.contains(&"sync_queue".to_string()));
        assert!(tables.contains(&"schema_info".to_string()));
    }

    #[test]
    fn test_schema_version() {
        let conn = Connection::open_in_memory().unwrap();

        assert!(needs_init(&conn));

        init_schema(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
        assert!(!needs_init(&conn));
    }

    #[test]
    fn test_init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let columns = table_columns(&conn, "rentals").unwrap();
        assert_eq!(columns.iter().filter(|c| *c == "synced").count(), 1);
    }

    #[test]
    fn test_legacy_schema_is_migrated() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE items (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                category TEXT,
                price_per_day REAL,
                status TEXT
            );
            CREATE TABLE rentals (
                id TEXT PRIMARY KEY,
                item_id TEXT,
                customer_name TEXT,
                rental_date TEXT,
                return_date TEXT,
                total_cost REAL,
                status TEXT
            );
            INSERT INTO items VALUES ('i1', 'Tent', 'Camping', 45000, 'available');
            INSERT INTO rentals VALUES ('r1', 'i1', 'Sari', '2023-10-01', '2023-10-03', 90000, 'active');
            "#,
        )
        .unwrap();

        init_schema(&conn).unwrap();

        let item_columns = table_columns(&conn, "items").unwrap();
        assert!(item_columns.contains(&"pricePerDay".to_string()));
        assert!(!item_columns.contains(&"price_per_day".to_string()));
        assert!(item_columns.contains(&"stock".to_string()));
        assert!(item_columns.contains(&"imageUrl".to_string()));

        let rental_columns = table_columns(&conn, "rentals").unwrap();
        for name in ["itemId", "customerName", "startDate", "endDate", "totalCost"] {
            assert!(rental_columns.contains(&name.to_string()), "missing {}", name);
        }

        let (stock, item_name): (i64, String) = conn
            .query_row(
                "SELECT items.stock, rentals.itemName FROM items, rentals WHERE rentals.id = 'r1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(stock, 1);
        assert_eq!(item_name, "Tent");
    }

    #[test]
    fn test_first_release_tables_are_rebuilt() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(FIRST_RELEASE_FIXTURE).unwrap();
        assert!(has_legacy_layout(&conn).unwrap());

        init_schema(&conn).unwrap();
        assert!(!has_legacy_layout(&conn).unwrap());

        let id_types: Vec<(String, String)> = conn
            .prepare("SELECT typeof(id), typeof(itemId) FROM rentals ORDER BY rowid")
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(id_types.len(), 4);
        assert!(id_types.iter().all(|(id, item)| id == "text" && item == "text"));

        let rentals: Vec<(String, String, String, String)> = conn
            .prepare("SELECT id, itemId, itemName, status FROM rentals ORDER BY rowid")
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        let statuses: Vec<&str> = rentals.iter().map(|r| r.3.as_str()).collect();
        assert_eq!(statuses, vec!["active", "completed", "completed", "overdue"]);
        assert_eq!(rentals[0].0, "1");
        assert_eq!(rentals[0].1, "1");
        assert_eq!(rentals[0].2, "Canon EOS R5");
        assert_eq!(rentals[2].2, "Tent 4 Person");

        let (id, image_url): (String, String) = conn
            .query_row("SELECT id, imageUrl FROM items WHERE name = 'Canon EOS R5'", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(id, "1");
        let stored_status: String = conn
            .query_row("SELECT status FROM items WHERE id = '1'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(stored_status, "available");
        assert!(image_url.starts_with("https://images.unsplash.com/"));
        assert!(!table_columns(&conn, "items").unwrap().contains(&"image_url".to_string()));

        // New records use text ids alongside the migrated ones
        conn.execute(
            "INSERT INTO items (id, name, category, pricePerDay) VALUES ('b3f1c2d4', 'Tripod', 'Camera', 20000)",
            [],
        )
        .unwrap();
    }

    #[test]
    fn test_indexes_exist() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let indexes: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(indexes.contains(&"idx_rentals_item_status".to_string()));
        assert!(indexes.contains(&"idx_sync_queue_order".to_string()));
    }
}
