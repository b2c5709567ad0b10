//! Static table descriptors and idempotent schema creation.

use log::{debug, info};
use rusqlite::Connection;

use crate::error::{DatabaseResultExt, Result};

pub const TBL_CONFIGURATIONS: &str = "configurations";
pub const TBL_MEASURING_UNITS: &str = "measuring_units";
pub const TBL_ITEMS: &str = "items";
pub const TBL_BRANDS: &str = "brands";
pub const TBL_STORES: &str = "stores";
pub const TBL_STORE_BRANCHES: &str = "store_branches";
pub const TBL_PRICES: &str = "prices";
pub const TBL_SHOPPING_LISTS: &str = "shopping_lists";
pub const TBL_SHOPPING_LIST_ITEMS: &str = "shopping_list_items";

pub const COL_ID: &str = "id";
pub const COL_KEY: &str = "key";
pub const COL_VALUE: &str = "value";
pub const COL_NAME: &str = "name";
pub const COL_USER_ID: &str = "user_id";
pub const COL_MODE: &str = "mode";
pub const COL_CREATE_DATE: &str = "create_date";
pub const COL_UPDATE_DATE: &str = "update_date";

/// A table known at compile time: its name and the body of its
/// `CREATE TABLE` statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDesc {
    pub name: &'static str,
    pub columns: &'static str,
}

impl TableDesc {
    pub const fn new(name: &'static str, columns: &'static str) -> Self {
        Self { name, columns }
    }

    fn create_sql(&self) -> String {
        format!("CREATE TABLE IF NOT EXISTS {} ({})", self.name, self.columns)
    }
}

/// Every table the service expects, referenced tables first.
pub const ALL_TABLE_DESCS: &[TableDesc] = &[
    TableDesc::new(
        TBL_CONFIGURATIONS,
        "key TEXT PRIMARY KEY NOT NULL,
         value BLOB NOT NULL,
         update_date TEXT NOT NULL",
    ),
    TableDesc::new(
        TBL_MEASURING_UNITS,
        "id INTEGER PRIMARY KEY AUTOINCREMENT,
         name TEXT NOT NULL UNIQUE,
         create_date TEXT NOT NULL,
         update_date TEXT NOT NULL",
    ),
    TableDesc::new(
        TBL_ITEMS,
        "id INTEGER PRIMARY KEY AUTOINCREMENT,
         name TEXT NOT NULL UNIQUE,
         create_date TEXT NOT NULL,
         update_date TEXT NOT NULL",
    ),
    TableDesc::new(
        TBL_BRANDS,
        "id INTEGER PRIMARY KEY AUTOINCREMENT,
         name TEXT NOT NULL,
         measuring_unit_id INTEGER NOT NULL REFERENCES measuring_units (id),
         item_id INTEGER NOT NULL REFERENCES items (id),
         create_date TEXT NOT NULL,
         update_date TEXT NOT NULL,
         UNIQUE (name, item_id)",
    ),
    TableDesc::new(
        TBL_STORES,
        "id INTEGER PRIMARY KEY AUTOINCREMENT,
         name TEXT NOT NULL UNIQUE,
         create_date TEXT NOT NULL,
         update_date TEXT NOT NULL",
    ),
    TableDesc::new(
        TBL_STORE_BRANCHES,
        "id INTEGER PRIMARY KEY AUTOINCREMENT,
         name TEXT NOT NULL,
         store_id INTEGER NOT NULL REFERENCES stores (id),
         create_date TEXT NOT NULL,
         update_date TEXT NOT NULL,
         UNIQUE (name, store_id)",
    ),
    TableDesc::new(
        TBL_PRICES,
        "id INTEGER PRIMARY KEY AUTOINCREMENT,
         value REAL NOT NULL,
         currency TEXT NOT NULL,
         brand_id INTEGER NOT NULL REFERENCES brands (id),
         store_branch_id INTEGER NOT NULL REFERENCES store_branches (id),
         create_date TEXT NOT NULL,
         update_date TEXT NOT NULL",
    ),
    TableDesc::new(
        TBL_SHOPPING_LISTS,
        "id INTEGER PRIMARY KEY AUTOINCREMENT,
         user_id TEXT NOT NULL,
         name TEXT NOT NULL,
         mode TEXT NOT NULL DEFAULT 'PREPARATION',
         create_date TEXT NOT NULL,
         update_date TEXT NOT NULL,
         UNIQUE (user_id, name)",
    ),
    TableDesc::new(
        TBL_SHOPPING_LIST_ITEMS,
        "id INTEGER PRIMARY KEY AUTOINCREMENT,
         shopping_list_id INTEGER NOT NULL REFERENCES shopping_lists (id) ON DELETE CASCADE,
         price_id INTEGER NOT NULL REFERENCES prices (id),
         quantity INTEGER NOT NULL DEFAULT 1,
         in_list INTEGER NOT NULL DEFAULT 1,
         in_cart INTEGER NOT NULL DEFAULT 0,
         create_date TEXT NOT NULL,
         update_date TEXT NOT NULL,
         UNIQUE (shopping_list_id, price_id)",
    ),
];

/// Brings `db_name` and all of `tables` into existence if they are absent.
///
/// Safe to run against an already-initialized database. SQLite materializes
/// the database file when the connector opens it, so the database step here
/// only pins the connection-wide settings the tables rely on.
pub fn instantiate(conn: &Connection, db_name: &str, tables: &[TableDesc]) -> Result<()> {
    create_database(conn, db_name)?;
    for table in tables {
        conn.execute_batch(&table.create_sql())
            .ddl_context(&format!("create table {}", table.name))?;
        debug!("Table {} ready", table.name);
    }
    info!("Database {db_name} instantiated with {} table(s)", tables.len());
    Ok(())
}

/// Reports whether `name` exists as a table in the main database.
pub fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [name],
        |row| row.get(0),
    )
    .db_context("look up table")
}

fn create_database(conn: &Connection, db_name: &str) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .ddl_context(&format!("enable foreign keys on {db_name}"))?;

    // In-memory databases only support the "memory" journal.
    if conn.path().is_some_and(|p| !p.is_empty()) {
        let mode: String = conn
            .query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))
            .ddl_context(&format!("set journal mode on {db_name}"))?;
        debug!("Database {db_name} journal mode: {mode}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .expect("Failed to prepare");
        stmt.query_map([], |row| row.get(0))
            .expect("Failed to query")
            .collect::<rusqlite::Result<Vec<String>>>()
            .expect("Failed to collect")
    }

    #[test]
    fn test_instantiate_creates_all_tables() {
        let conn = Connection::open_in_memory().expect("Failed to open");
        instantiate(&conn, "shop", ALL_TABLE_DESCS).expect("Failed to instantiate");

        let names = table_names(&conn);
        for table in ALL_TABLE_DESCS {
            assert!(names.iter().any(|n| n == table.name), "missing {}", table.name);
        }
    }

    #[test]
    fn test_instantiate_is_idempotent() {
        let conn = Connection::open_in_memory().expect("Failed to open");
        instantiate(&conn, "shop", ALL_TABLE_DESCS).expect("first instantiate");
        conn.execute(
            "INSERT INTO items (name, create_date, update_date) VALUES ('milk', 'now', 'now')",
            [],
        )
        .expect("Failed to insert item");

        instantiate(&conn, "shop", ALL_TABLE_DESCS).expect("second instantiate");

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .expect("Failed to count");
        assert_eq!(count, 1, "existing rows survive re-instantiation");
    }

    #[test]
    fn test_broken_descriptor_is_a_ddl_error() {
        let conn = Connection::open_in_memory().expect("Failed to open");
        let broken = [TableDesc::new("broken", "id INTEGER PRIMARY KEY,,")];
        let err = instantiate(&conn, "shop", &broken).expect_err("DDL should fail");
        assert!(matches!(err, crate::StoreError::Instantiate { .. }));
    }

    #[test]
    fn test_table_exists() {
        let conn = Connection::open_in_memory().expect("Failed to open");
        assert!(!table_exists(&conn, TBL_CONFIGURATIONS).expect("lookup"));
        instantiate(&conn, "shop", ALL_TABLE_DESCS).expect("Failed to instantiate");
        assert!(table_exists(&conn, TBL_CONFIGURATIONS).expect("lookup"));
    }
}
