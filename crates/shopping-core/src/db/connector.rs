//! Connection pool setup and checkout.
//!
//! The pool opens connections lazily, so building one touches nothing on
//! disk. Every connection it hands out has the busy timeout and foreign keys
//! applied and has answered a ping.

use std::time::{Duration, Instant};

use log::{debug, warn};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, ErrorCode, OpenFlags};

use crate::{
    config::{DataSource, StoreConfig},
    context::CallContext,
    error::{DatabaseResultExt, Result, StoreError},
};

pub type ConnectionPool = Pool<SqliteConnectionManager>;
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Longest single wait on the pool between cancellation checks.
const CHECKOUT_SLICE: Duration = Duration::from_millis(50);

/// Builds the pool for `config`'s data source without opening a connection.
pub fn build_pool(config: &StoreConfig) -> ConnectionPool {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let manager = match &config.data_source {
        DataSource::File(path) => SqliteConnectionManager::file(path),
        DataSource::Memory => SqliteConnectionManager::memory(),
    };
    let busy_timeout = config.busy_timeout();
    let manager = manager.with_flags(flags).with_init(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
    });

    Pool::builder()
        .max_size(config.pool_size.max(1))
        .min_idle(Some(0))
        .connection_timeout(config.connect_timeout().max(Duration::from_millis(1)))
        .build_unchecked(manager)
}

/// Checks out a live connection from `pool`.
///
/// Transient failures (the pool timing out, the file being locked) are
/// retried with the connect policy's backoff until a connection is handed
/// out, the source is judged unreachable, or `ctx` gives up. Cancellation
/// and deadline errors are returned as they are.
pub fn try_connect(
    pool: &ConnectionPool,
    config: &StoreConfig,
    ctx: &CallContext,
) -> Result<PooledConnection> {
    let policy = &config.connect_retry;
    let attempts = policy.attempts();
    let mut attempt = 0;
    loop {
        ctx.check()?;
        attempt += 1;
        let err = match checkout(pool, &config.data_source, config.connect_timeout(), ctx) {
            Ok(conn) => {
                debug!("Checked out connection to {} (attempt {attempt})", config.data_source);
                return Ok(conn);
            }
            Err(e @ (StoreError::Cancelled | StoreError::DeadlineExceeded)) => return Err(e),
            Err(e) => e,
        };

        if !is_transient(&err) || attempt >= attempts {
            return Err(StoreError::Connect {
                attempts: attempt,
                source: Box::new(err),
            });
        }
        let delay = policy.backoff(attempt);
        warn!(
            "Connecting to {} failed (attempt {attempt}/{attempts}), retrying in {delay:?}: {err}",
            config.data_source
        );
        ctx.sleep(delay)?;
    }
}

/// Waits up to `timeout` for a pooled connection, in slices short enough to
/// notice cancellation and the caller's deadline.
fn checkout(
    pool: &ConnectionPool,
    source: &DataSource,
    timeout: Duration,
    ctx: &CallContext,
) -> Result<PooledConnection> {
    if let DataSource::File(path) = source {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::FileSystem {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    let give_up = Instant::now() + timeout;
    loop {
        ctx.check()?;
        let slice = give_up
            .saturating_duration_since(Instant::now())
            .clamp(Duration::from_millis(1), CHECKOUT_SLICE);
        match pool.get_timeout(slice) {
            Ok(conn) => {
                ping(&conn)?;
                return Ok(conn);
            }
            Err(source) if Instant::now() >= give_up => return Err(StoreError::Pool { source }),
            Err(_) => {}
        }
    }
}

/// Round-trips a trivial query to prove the handle works.
pub fn ping(conn: &Connection) -> Result<()> {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .db_context("ping database")?;
    Ok(())
}

/// Failures worth another attempt: the pool may free up and the file may be
/// locked by a peer. Anything else (not a database, permission denied, bad
/// path) will not improve by waiting.
fn is_transient(err: &StoreError) -> bool {
    match err {
        StoreError::Pool { .. } => true,
        StoreError::Database { source, .. } => matches!(
            source.sqlite_error_code(),
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen)
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::RetryPolicy;

    fn config(source: DataSource) -> StoreConfig {
        StoreConfig {
            data_source: source,
            connect_timeout_ms: 100,
            connect_retry: RetryPolicy::immediate(1),
            ..StoreConfig::default()
        }
    }

    #[test]
    fn test_building_pool_touches_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("nested").join("shop.db");

        let _pool = build_pool(&config(DataSource::File(path.clone())));

        assert!(!path.exists());
        assert!(!temp_dir.path().join("nested").exists());
    }

    #[test]
    fn test_connect_creates_missing_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("nested").join("deeper").join("shop.db");
        let config = config(DataSource::File(path.clone()));
        let pool = build_pool(&config);

        let conn = try_connect(&pool, &config, &CallContext::background())
            .expect("Failed to connect");

        assert!(ping(&conn).is_ok());
        assert!(path.exists());
    }

    #[test]
    fn test_memory_connections_share_one_database() {
        let config = StoreConfig {
            pool_size: 2,
            ..config(DataSource::Memory)
        };
        let pool = build_pool(&config);
        let ctx = CallContext::background();

        let first = try_connect(&pool, &config, &ctx).expect("Failed to connect");
        first
            .execute_batch("CREATE TABLE marker (id INTEGER)")
            .expect("Failed to create marker table");
        let second = try_connect(&pool, &config, &ctx).expect("Failed to connect");

        let count: i64 = second
            .query_row("SELECT COUNT(*) FROM marker", [], |row| row.get(0))
            .expect("marker table should be visible");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_unreachable_source_reports_connect_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"plain file").expect("Failed to write blocker");
        let config = StoreConfig {
            connect_retry: RetryPolicy::immediate(3),
            ..config(DataSource::File(blocker.join("shop.db")))
        };

        let err = try_connect(&build_pool(&config), &config, &CallContext::background())
            .expect_err("connect should fail");

        assert!(matches!(err, StoreError::Connect { attempts: 1, .. }));
    }

    #[test]
    fn test_exhausted_pool_gives_up_at_deadline() {
        let config = StoreConfig {
            pool_size: 1,
            connect_timeout_ms: 60_000,
            ..config(DataSource::Memory)
        };
        let pool = build_pool(&config);
        let _held = try_connect(&pool, &config, &CallContext::background())
            .expect("Failed to connect");

        let started = Instant::now();
        let err = try_connect(&pool, &config, &CallContext::with_timeout(Duration::from_millis(30)))
            .expect_err("pool is exhausted");

        assert!(matches!(err, StoreError::DeadlineExceeded));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_cancelled_context_stops_before_connecting() {
        let config = config(DataSource::Memory);
        let ctx = CallContext::background();
        ctx.token().cancel();

        let err = try_connect(&build_pool(&config), &config, &ctx)
            .expect_err("cancelled connect should fail");
        assert!(matches!(err, StoreError::Cancelled));
    }
}
