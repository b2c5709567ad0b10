//! Database initialization and transaction execution.
//!
//! [`Database`] owns the connection pool and the init gate state. Every store
//! operation first passes through [`Database::ensure_ready`], which connects,
//! creates the schema and validates the persisted schema version exactly
//! once per process:
//!
//! ```text
//! Uninitialized ──ensure_ready──▶ connect ─▶ instantiate ─▶ validate version
//!       ▲                                                       │
//!       │ connect/DDL error            ┌── current / not found ─┤
//!       └──────────────────────        ▼                        │ mismatch
//!                                    Ready ◀── migrated ── migrate
//!                                                               │ failed
//!                                                               ▼
//!                                                         Incompatible
//! ```
//!
//! Connect and DDL failures leave the gate uninitialized so a later call can
//! try again. An unresolvable version mismatch is cached and returned to
//! every later caller without touching the database.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard, RwLock, TryLockError,
    },
    time::Duration,
};

use log::{debug, info, warn};
use rusqlite::Transaction;

use crate::{
    config::{DataSource, StoreConfig},
    context::CallContext,
    error::{DatabaseResultExt, Result, StoreError},
    models::{InitState, PersistedVersion, StoreStatus},
};

pub mod connector;
pub mod list_queries;
pub mod migrations;
pub mod schema;
pub mod tx;
pub mod utils;
pub mod version;

use connector::{ConnectionPool, PooledConnection};
use migrations::MigrationRegistry;
use schema::{TableDesc, ALL_TABLE_DESCS};
use version::SCHEMA_VERSION;

/// How often a caller queued behind another caller's initialization
/// re-checks its own context.
const INIT_WAIT_POLL: Duration = Duration::from_millis(5);

/// Shared store handle: connection pool, init gate and transaction executor.
///
/// No connection is made until the first call to [`Database::ensure_ready`],
/// [`Database::execute_tx`] or [`Database::status`].
pub struct Database {
    config: StoreConfig,
    tables: &'static [TableDesc],
    migrations: MigrationRegistry,
    pool: ConnectionPool,
    /// Settled gate state. Only written while `init_lock` is held.
    state: RwLock<InitState>,
    init_lock: Mutex<()>,
    init_runs: AtomicU64,
}

impl Database {
    /// Creates a store for `config` with the service's table set and no
    /// registered migrations.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            pool: connector::build_pool(&config),
            config,
            tables: ALL_TABLE_DESCS,
            migrations: MigrationRegistry::new(),
            state: RwLock::new(InitState::Uninitialized),
            init_lock: Mutex::new(()),
            init_runs: AtomicU64::new(0),
        }
    }

    /// Replaces the migration registry.
    pub fn with_migrations(mut self, migrations: MigrationRegistry) -> Self {
        self.migrations = migrations;
        self
    }

    /// Replaces the table set created during initialization.
    pub fn with_tables(mut self, tables: &'static [TableDesc]) -> Self {
        self.tables = tables;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of times the connect, instantiate, validate sequence has run.
    pub fn init_runs(&self) -> u64 {
        self.init_runs.load(Ordering::SeqCst)
    }

    /// Current gate state.
    pub fn state(&self) -> Result<InitState> {
        Ok(self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .clone())
    }

    /// Brings the store to a ready state, running initialization at most
    /// once no matter how many callers race here.
    ///
    /// Once the gate has settled this only reads the cached state; it never
    /// waits on running transactions. Callers that arrive while another one
    /// initializes wait for it to finish, or for their own context to give
    /// up.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connect`] or [`StoreError::Instantiate`] when the
    /// attempt fails (a later call retries), and the cached
    /// [`StoreError::Incompatible`] once the schema version is found
    /// unresolvable.
    pub fn ensure_ready(&self, ctx: &CallContext) -> Result<()> {
        if let Some(settled) = self.settled() {
            return settled;
        }
        let _init = self.lock_init(ctx)?;
        // Another caller may have settled the gate while this one waited.
        if let Some(settled) = self.settled() {
            return settled;
        }

        let run = self.init_runs.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "Initializing store {} at {} (run {run})",
            self.config.db_name, self.config.data_source
        );

        let mut conn = self.connect(ctx)?;
        schema::instantiate(&conn, &self.config.db_name, self.tables)?;

        ctx.check()?;
        match version::validate_running_version(&conn, SCHEMA_VERSION) {
            Ok(()) => debug!("Schema version {SCHEMA_VERSION} is current"),
            Err(e) if e.is_not_found() => {
                version::set_running_version(&conn, SCHEMA_VERSION)?;
                info!("Recorded schema version {SCHEMA_VERSION} on fresh database");
            }
            Err(StoreError::Incompatible(fault)) => {
                if self.migrations.is_empty() {
                    warn!("{fault}; no migrations registered");
                } else {
                    warn!("{fault}; trying {} registered migration step(s)", self.migrations.len());
                }
                if let Err(e) = self.migrations.migrate(&mut conn, fault.found, SCHEMA_VERSION) {
                    let fault = fault.caused_by(&e);
                    warn!("Store marked incompatible: {fault}");
                    self.settle(InitState::Incompatible(fault.clone()))?;
                    return Err(StoreError::Incompatible(fault));
                }
                info!("Migrated schema from version {} to {SCHEMA_VERSION}", fault.found);
            }
            Err(e) => return Err(e),
        }

        self.settle(InitState::Ready)?;
        info!("Store {} ready", self.config.db_name);
        Ok(())
    }

    /// Runs `work` in a transaction once the store is ready.
    ///
    /// Commits when `work` succeeds, rolls back and returns its error when it
    /// fails, and transparently re-runs the whole transaction on contention.
    /// `work` must therefore be safe to repeat.
    ///
    /// Each attempt checks out its own pooled connection and hands it back
    /// before any backoff sleep, so `work` may call other methods on this
    /// `Database`. It must not open a nested transaction: that one would
    /// contend with its parent until its retries run out.
    pub fn execute_tx<T, F>(&self, ctx: &CallContext, mut work: F) -> Result<T>
    where
        F: FnMut(&Transaction<'_>) -> Result<T>,
    {
        self.ensure_ready(ctx)?;

        tx::retry_contended(&self.config.tx_retry, ctx, || {
            let mut conn = self.connect(ctx)?;
            tx::run_once(&mut conn, &mut work)
        })
    }

    /// Reports the gate state and what the database currently records,
    /// without triggering initialization. A database file that does not
    /// exist yet is reported as absent and is not created.
    pub fn status(&self, ctx: &CallContext) -> Result<StoreStatus> {
        let database_exists = match &self.config.data_source {
            DataSource::File(path) => path.exists(),
            DataSource::Memory => true,
        };
        let persisted = if database_exists {
            self.persisted_version(ctx)?
        } else {
            None
        };

        Ok(StoreStatus {
            data_source: self.config.data_source.to_string(),
            db_name: self.config.db_name.clone(),
            database_exists,
            expected_version: SCHEMA_VERSION,
            persisted,
            state: self.state()?,
            init_runs: self.init_runs(),
        })
    }

    fn persisted_version(&self, ctx: &CallContext) -> Result<Option<PersistedVersion>> {
        let conn = self.connect(ctx)?;
        if !schema::table_exists(&conn, schema::TBL_CONFIGURATIONS)? {
            return Ok(None);
        }
        version::read_config(&conn, version::KEY_DB_VERSION)?
            .map(|record| -> Result<PersistedVersion> {
                Ok(PersistedVersion {
                    version: serde_json::from_slice(&record.value)?,
                    updated_at: record.updated_at,
                })
            })
            .transpose()
    }

    fn connect(&self, ctx: &CallContext) -> Result<PooledConnection> {
        let conn = connector::try_connect(&self.pool, &self.config, ctx)?;
        // SQLite's own busy wait must not outlast the caller's deadline.
        let busy_timeout = ctx
            .remaining()
            .map_or(self.config.busy_timeout(), |left| left.min(self.config.busy_timeout()));
        conn.busy_timeout(busy_timeout)
            .db_context("set busy timeout")?;
        Ok(conn)
    }

    /// The cached outcome, once the gate has settled.
    fn settled(&self) -> Option<Result<()>> {
        let state = match self.state.read() {
            Ok(state) => state,
            Err(_) => return Some(Err(StoreError::LockPoisoned)),
        };
        match &*state {
            InitState::Ready => Some(Ok(())),
            InitState::Incompatible(fault) => {
                debug!("Store incompatible, returning cached fault");
                Some(Err(StoreError::Incompatible(fault.clone())))
            }
            InitState::Uninitialized => None,
        }
    }

    fn settle(&self, state: InitState) -> Result<()> {
        *self.state.write().map_err(|_| StoreError::LockPoisoned)? = state;
        Ok(())
    }

    /// Waits for the init lock without outliving the caller's context.
    fn lock_init(&self, ctx: &CallContext) -> Result<MutexGuard<'_, ()>> {
        loop {
            match self.init_lock.try_lock() {
                Ok(guard) => return Ok(guard),
                // The lock guards no data, so a panicked run leaves nothing to repair.
                Err(TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => ctx.sleep(INIT_WAIT_POLL)?,
            }
        }
    }
}
