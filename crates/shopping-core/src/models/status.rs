//! Init gate state and store status snapshots.

use jiff::Timestamp;

use crate::error::CompatibilityFault;

/// Settled state of the init gate.
///
/// Initialization runs entirely under the store lock, so no caller ever
/// observes it half done: the gate is either not yet initialized, ready, or
/// holding a cached compatibility fault.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InitState {
    #[default]
    Uninitialized,
    Ready,
    Incompatible(CompatibilityFault),
}

impl InitState {
    pub fn is_ready(&self) -> bool {
        matches!(self, InitState::Ready)
    }
}

/// Raw row from the configuration table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRecord {
    pub key: String,
    /// JSON-encoded value.
    pub value: Vec<u8>,
    pub updated_at: Timestamp,
}

/// The schema version as recorded in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistedVersion {
    pub version: i64,
    pub updated_at: Timestamp,
}

/// Point-in-time view of the store for operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatus {
    pub data_source: String,
    pub db_name: String,
    /// False while a database file has not been created yet.
    pub database_exists: bool,
    pub expected_version: i64,
    pub persisted: Option<PersistedVersion>,
    pub state: InitState,
    /// How many times the initialization sequence has run in this process.
    pub init_runs: u64,
}
