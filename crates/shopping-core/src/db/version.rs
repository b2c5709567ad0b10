//! The persisted schema-version marker.
//!
//! The marker is one row in the configuration table keyed by
//! [`KEY_DB_VERSION`]; its value is the JSON encoding of an integer.

use jiff::Timestamp;
use rusqlite::{params, types::Type, Connection, OptionalExtension};

use super::{
    schema::{COL_KEY, COL_UPDATE_DATE, COL_VALUE, TBL_CONFIGURATIONS},
    utils::{check_rows_affected, col_desc},
};
use crate::{
    error::{CompatibilityFault, DatabaseResultExt, Result, StoreError},
    models::ConfigRecord,
};

/// Schema version the running code expects.
pub const SCHEMA_VERSION: i64 = 1;

/// Configuration key holding the persisted schema version.
pub const KEY_DB_VERSION: &str = "db.version";

/// Reads the raw configuration row for `key`.
pub fn read_config(conn: &Connection, key: &str) -> Result<Option<ConfigRecord>> {
    let sql = format!(
        "SELECT {} FROM {TBL_CONFIGURATIONS} WHERE {COL_KEY} = ?1",
        col_desc(&[COL_KEY, COL_VALUE, COL_UPDATE_DATE])
    );
    conn.query_row(&sql, params![key], |row| {
        Ok(ConfigRecord {
            key: row.get(0)?,
            value: row.get(1)?,
            updated_at: row.get::<_, String>(2)?.parse::<Timestamp>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
            })?,
        })
    })
    .optional()
    .db_context("get conf")
}

/// Decodes the persisted schema version, if one is recorded.
pub fn running_version(conn: &Connection) -> Result<Option<i64>> {
    read_config(conn, KEY_DB_VERSION)?
        .map(|record| serde_json::from_slice::<i64>(&record.value))
        .transpose()
        .map_err(StoreError::from)
}

/// Compares the persisted version with `expected`.
///
/// Fails with [`StoreError::NotFound`] when no version has been recorded yet
/// and with [`StoreError::Incompatible`] (carrying the persisted version)
/// when the two differ.
pub fn validate_running_version(conn: &Connection, expected: i64) -> Result<()> {
    match running_version(conn)? {
        None => Err(StoreError::not_found("config db.version")),
        Some(found) if found != expected => {
            Err(StoreError::Incompatible(CompatibilityFault::new(expected, found)))
        }
        Some(_) => Ok(()),
    }
}

/// Upserts the version marker to `version`, stamping the update time.
pub fn set_running_version(conn: &Connection, version: i64) -> Result<()> {
    let value = serde_json::to_vec(&version)?;
    let sql = format!(
        "INSERT INTO {TBL_CONFIGURATIONS} ({cols}) VALUES (?1, ?2, ?3)
         ON CONFLICT ({COL_KEY}) DO UPDATE SET {COL_VALUE} = ?2, {COL_UPDATE_DATE} = ?3",
        cols = col_desc(&[COL_KEY, COL_VALUE, COL_UPDATE_DATE]),
    );
    let now = Timestamp::now().to_string();
    check_rows_affected(
        conn.execute(&sql, params![KEY_DB_VERSION, value, now]),
        1,
        "config db.version",
    )
}
