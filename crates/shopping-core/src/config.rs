//! Store configuration.
//!
//! [`StoreConfig`] is plain data: it can be deserialized from a config file
//! or assembled through [`crate::store::StoreBuilder`].

use std::{fmt, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Canonical name of the service; doubles as the default database name.
pub const CANONICAL_NAME: &str = "shoppingms";

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum DataSource {
    /// A database file, created on first connect.
    File(PathBuf),
    /// A private in-memory database shared by the store's pooled
    /// connections. It lives as long as the store.
    Memory,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Memory => write!(f, ":memory:"),
        }
    }
}

/// Bounded retry with capped exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff_ms: u64,
    /// Upper bound for any single delay.
    pub max_backoff_ms: u64,
}

impl RetryPolicy {
    /// Policy used by the connector.
    pub const CONNECT: RetryPolicy = RetryPolicy {
        max_attempts: 5,
        initial_backoff_ms: 100,
        max_backoff_ms: 2_000,
    };

    /// Policy used by the transaction executor.
    pub const TRANSACTION: RetryPolicy = RetryPolicy {
        max_attempts: 10,
        initial_backoff_ms: 5,
        max_backoff_ms: 500,
    };

    /// A policy that never waits between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let shift = (attempt - 1).min(20);
        let millis = self.initial_backoff_ms.saturating_mul(1_u64 << shift);
        Duration::from_millis(millis.min(self.max_backoff_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::TRANSACTION
    }
}

/// Everything the store needs to reach and shape its database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub data_source: DataSource,
    /// Logical database name. Selects the default database file name.
    pub db_name: String,
    /// How long SQLite waits on a locked database before reporting busy.
    pub busy_timeout_ms: u64,
    /// Upper bound on open connections.
    pub pool_size: u32,
    /// How long one connect attempt waits for a pooled connection.
    pub connect_timeout_ms: u64,
    pub connect_retry: RetryPolicy,
    pub tx_retry: RetryPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_source: DataSource::Memory,
            db_name: CANONICAL_NAME.to_string(),
            busy_timeout_ms: 5_000,
            pool_size: 8,
            connect_timeout_ms: 5_000,
            connect_retry: RetryPolicy::CONNECT,
            tx_retry: RetryPolicy::TRANSACTION,
        }
    }
}

impl StoreConfig {
    /// Configuration for a database file at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            data_source: DataSource::File(path.into()),
            ..Self::default()
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
