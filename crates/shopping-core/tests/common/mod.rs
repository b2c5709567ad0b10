#![allow(dead_code)]

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use shopping_core::{
    db::version::{read_config, set_running_version, KEY_DB_VERSION},
    models::ConfigRecord,
    CallContext, Database, DataSource, RetryPolicy, StoreConfig,
};
use tempfile::TempDir;

/// Helper function to create a store configuration backed by a temp file
pub fn test_config() -> (TempDir, StoreConfig) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = config_at(&temp_dir.path().join("test.db"));
    (temp_dir, config)
}

pub fn config_at(path: &Path) -> StoreConfig {
    StoreConfig {
        data_source: DataSource::File(path.to_path_buf()),
        connect_retry: RetryPolicy::immediate(1),
        tx_retry: RetryPolicy::immediate(3),
        ..StoreConfig::default()
    }
}

pub fn db_path(config: &StoreConfig) -> PathBuf {
    match &config.data_source {
        DataSource::File(path) => path.clone(),
        DataSource::Memory => panic!("test config must be file backed"),
    }
}

/// Initializes a database at the config's path, then overwrites its
/// persisted schema version with `version`.
pub fn seed_version(config: &StoreConfig, version: i64) {
    Database::new(config.clone())
        .ensure_ready(&CallContext::background())
        .expect("Failed to seed database");
    let conn = raw_connection(config);
    set_running_version(&conn, version).expect("Failed to overwrite version");
}

pub fn raw_connection(config: &StoreConfig) -> Connection {
    Connection::open(db_path(config)).expect("Failed to open raw connection")
}

pub fn version_record(config: &StoreConfig) -> Option<ConfigRecord> {
    read_config(&raw_connection(config), KEY_DB_VERSION).expect("Failed to read config")
}

pub fn count_rows(config: &StoreConfig, table: &str) -> i64 {
    raw_connection(config)
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .expect("Failed to count rows")
}
