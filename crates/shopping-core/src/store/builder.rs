//! Builder for creating and configuring Store instances.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use super::Store;
use crate::{
    config::{DataSource, RetryPolicy, StoreConfig, CANONICAL_NAME},
    context::CallContext,
    db::{migrations::MigrationRegistry, Database},
    error::{Result, StoreError},
};

/// Builder for creating and configuring Store instances.
#[derive(Debug, Default)]
pub struct StoreBuilder {
    config: Option<StoreConfig>,
    database_path: Option<PathBuf>,
    in_memory: bool,
    db_name: Option<String>,
    busy_timeout_ms: Option<u64>,
    connect_retry: Option<RetryPolicy>,
    tx_retry: Option<RetryPolicy>,
    migrations: Option<MigrationRegistry>,
    cancel: Option<CancellationToken>,
}

impl StoreBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a loaded configuration; later setters override it.
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets a custom database file path.
    ///
    /// If neither a path nor a file-backed config is given, uses the XDG Base
    /// Directory specification:
    /// `$XDG_DATA_HOME/shoppingms/<db_name>.db`
    pub fn with_database_path<P: AsRef<Path>>(mut self, path: Option<P>) -> Self {
        if let Some(path) = path {
            self.database_path = Some(path.as_ref().to_path_buf());
        }
        self
    }

    /// Uses a private in-memory database.
    pub fn in_memory(mut self) -> Self {
        self.in_memory = true;
        self
    }

    pub fn with_db_name(mut self, name: impl Into<String>) -> Self {
        self.db_name = Some(name.into());
        self
    }

    pub fn with_busy_timeout_ms(mut self, millis: u64) -> Self {
        self.busy_timeout_ms = Some(millis);
        self
    }

    pub fn with_connect_retry(mut self, policy: RetryPolicy) -> Self {
        self.connect_retry = Some(policy);
        self
    }

    pub fn with_tx_retry(mut self, policy: RetryPolicy) -> Self {
        self.tx_retry = Some(policy);
        self
    }

    pub fn with_migrations(mut self, migrations: MigrationRegistry) -> Self {
        self.migrations = Some(migrations);
        self
    }

    /// Ties the store's blocking work to an external cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Builds the configured store. No connection is made until the first
    /// store operation.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::XdgDirectory` if the default database path cannot
    /// be resolved, and `StoreError::InvalidInput` for an empty database name.
    pub fn build(self) -> Result<Store> {
        // A loaded config keeps its data source unless a setter overrides it.
        let explicit_source = self.config.is_some();
        let mut config = self.config.unwrap_or_default();

        if let Some(name) = self.db_name {
            config.db_name = name;
        }
        if config.db_name.trim().is_empty() {
            return Err(StoreError::invalid_input("db_name", "must not be empty"));
        }
        if let Some(millis) = self.busy_timeout_ms {
            config.busy_timeout_ms = millis;
        }
        if let Some(policy) = self.connect_retry {
            config.connect_retry = policy;
        }
        if let Some(policy) = self.tx_retry {
            config.tx_retry = policy;
        }

        config.data_source = if self.in_memory {
            DataSource::Memory
        } else if let Some(path) = self.database_path {
            DataSource::File(path)
        } else if explicit_source {
            config.data_source
        } else {
            DataSource::File(Self::default_database_path(&config.db_name)?)
        };

        let mut db = Database::new(config);
        if let Some(migrations) = self.migrations {
            db = db.with_migrations(migrations);
        }
        let mut ctx = CallContext::background();
        if let Some(token) = self.cancel {
            ctx = ctx.cancelled_by(token);
        }
        Ok(Store::new(db, ctx))
    }

    /// Returns the default database path following XDG Base Directory
    /// specification.
    fn default_database_path(db_name: &str) -> Result<PathBuf> {
        xdg::BaseDirectories::with_prefix(CANONICAL_NAME)
            .place_data_file(format!("{db_name}.db"))
            .map_err(|e| StoreError::XdgDirectory(e.to_string()))
    }
}
