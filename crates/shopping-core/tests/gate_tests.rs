mod common;

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier,
    },
    thread,
};

use common::{count_rows, seed_version, test_config, version_record};
use shopping_core::{
    CallContext, Database, InitState, MigrationRegistry, StoreError, SCHEMA_VERSION,
};

const CALLERS: usize = 16;

/// Calls `ensure_ready` from `CALLERS` threads released at the same moment.
fn race_ensure_ready(db: &Arc<Database>) -> Vec<shopping_core::Result<()>> {
    let barrier = Arc::new(Barrier::new(CALLERS));
    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let db = Arc::clone(db);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                db.ensure_ready(&CallContext::background())
            })
        })
        .collect();
    handles
        .into_iter()
        .map(|h| h.join().expect("caller thread panicked"))
        .collect()
}

fn counting_migration(from: i64, calls: &Arc<AtomicUsize>) -> MigrationRegistry {
    let calls = Arc::clone(calls);
    MigrationRegistry::new().register(from, SCHEMA_VERSION, move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

#[test]
fn test_concurrent_init_runs_once() {
    let (_temp_dir, config) = test_config();
    let db = Arc::new(Database::new(config));

    let results = race_ensure_ready(&db);

    assert!(results.iter().all(|r| r.is_ok()), "{results:?}");
    assert_eq!(db.init_runs(), 1);
    assert_eq!(db.state().expect("state"), InitState::Ready);
}

#[test]
fn test_concurrent_migration_runs_once() {
    let (_temp_dir, config) = test_config();
    seed_version(&config, SCHEMA_VERSION - 1);
    let calls = Arc::new(AtomicUsize::new(0));
    let db = Arc::new(
        Database::new(config.clone()).with_migrations(counting_migration(SCHEMA_VERSION - 1, &calls)),
    );

    let results = race_ensure_ready(&db);

    assert!(results.iter().all(|r| r.is_ok()), "{results:?}");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(db.init_runs(), 1);
    let record = version_record(&config).expect("version row");
    assert_eq!(record.value, SCHEMA_VERSION.to_string().into_bytes());
}

#[test]
fn test_fresh_database_records_current_version() {
    let (_temp_dir, config) = test_config();
    let db = Database::new(config.clone());

    db.ensure_ready(&CallContext::background())
        .expect("Failed to init fresh database");

    assert_eq!(count_rows(&config, "configurations"), 1);
    let record = version_record(&config).expect("version row");
    assert_eq!(record.key, "db.version");
    assert_eq!(record.value, SCHEMA_VERSION.to_string().into_bytes());
}

#[test]
fn test_matching_version_is_not_rewritten() {
    let (_temp_dir, config) = test_config();
    Database::new(config.clone())
        .ensure_ready(&CallContext::background())
        .expect("Failed to init");
    let before = version_record(&config).expect("version row");

    let calls = Arc::new(AtomicUsize::new(0));
    let db = Database::new(config.clone()).with_migrations(counting_migration(0, &calls));
    db.ensure_ready(&CallContext::background())
        .expect("Failed to re-init");

    assert_eq!(version_record(&config), Some(before));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(count_rows(&config, "configurations"), 1);
}

#[test]
fn test_incompatible_fault_is_sticky() {
    let (_temp_dir, config) = test_config();
    let stale = SCHEMA_VERSION + 41;
    seed_version(&config, stale);
    let before = version_record(&config).expect("version row");
    let db = Database::new(config.clone());
    let ctx = CallContext::background();

    let first = match db.ensure_ready(&ctx) {
        Err(StoreError::Incompatible(fault)) => fault,
        other => panic!("expected incompatible, got {other:?}"),
    };
    assert_eq!(first.expected, SCHEMA_VERSION);
    assert_eq!(first.found, stale);
    assert!(first.cause.is_some());

    for _ in 0..3 {
        match db.ensure_ready(&ctx) {
            Err(StoreError::Incompatible(fault)) => assert_eq!(fault, first),
            other => panic!("expected cached fault, got {other:?}"),
        }
    }
    let calls = std::cell::Cell::new(0);
    match db.execute_tx(&ctx, |_| {
        calls.set(calls.get() + 1);
        Ok(())
    }) {
        Err(StoreError::Incompatible(fault)) => assert_eq!(fault, first),
        other => panic!("expected cached fault, got {other:?}"),
    }

    assert_eq!(calls.get(), 0, "no unit of work runs on an incompatible store");
    assert_eq!(db.init_runs(), 1, "the fault is cached, not re-derived");
    assert_eq!(db.state().expect("state"), InitState::Incompatible(first));
    assert_eq!(version_record(&config), Some(before));
}

#[test]
fn test_concurrent_callers_share_the_fault() {
    let (_temp_dir, config) = test_config();
    seed_version(&config, SCHEMA_VERSION + 1);
    let db = Arc::new(Database::new(config));

    let faults: Vec<_> = race_ensure_ready(&db)
        .into_iter()
        .map(|r| match r {
            Err(StoreError::Incompatible(fault)) => fault,
            other => panic!("expected incompatible, got {other:?}"),
        })
        .collect();

    assert!(faults.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(db.init_runs(), 1);
}

#[test]
fn test_failed_migration_leaves_version_untouched() {
    let (_temp_dir, config) = test_config();
    seed_version(&config, SCHEMA_VERSION - 1);
    let before = version_record(&config).expect("version row");
    let registry = MigrationRegistry::new().register(SCHEMA_VERSION - 1, SCHEMA_VERSION, |_| {
        Err(StoreError::invalid_input("items", "cannot convert"))
    });
    let db = Database::new(config.clone()).with_migrations(registry);

    let err = db
        .ensure_ready(&CallContext::background())
        .expect_err("migration fails");

    match err {
        StoreError::Incompatible(fault) => {
            let cause = fault.cause.expect("cause recorded");
            assert!(cause.contains("cannot convert"), "{cause}");
        }
        other => panic!("expected incompatible, got {other:?}"),
    }
    assert_eq!(version_record(&config), Some(before));
}

#[test]
fn test_chained_migration_reaches_current_version() {
    let (_temp_dir, config) = test_config();
    seed_version(&config, SCHEMA_VERSION - 2);
    let calls = Arc::new(AtomicUsize::new(0));
    let (first, second) = (Arc::clone(&calls), Arc::clone(&calls));
    let registry = MigrationRegistry::new()
        .register(SCHEMA_VERSION - 2, SCHEMA_VERSION - 1, move |_| {
            first.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .register(SCHEMA_VERSION - 1, SCHEMA_VERSION, move |_| {
            second.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    let db = Database::new(config.clone()).with_migrations(registry);

    db.ensure_ready(&CallContext::background())
        .expect("chain should migrate");

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(db.state().expect("state"), InitState::Ready);
    let record = version_record(&config).expect("version row");
    assert_eq!(record.value, SCHEMA_VERSION.to_string().into_bytes());
}

#[test]
fn test_connect_failure_is_retried_on_next_call() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let parent = temp_dir.path().join("data");
    std::fs::write(&parent, b"in the way").expect("Failed to write blocker");
    let config = common::config_at(&parent.join("test.db"));
    let db = Database::new(config);
    let ctx = CallContext::background();

    let err = db.ensure_ready(&ctx).expect_err("parent is a file");
    assert!(matches!(err, StoreError::Connect { .. }));
    assert_eq!(db.state().expect("state"), InitState::Uninitialized);

    std::fs::remove_file(&parent).expect("Failed to remove blocker");
    db.ensure_ready(&ctx).expect("database reachable now");
    assert_eq!(db.init_runs(), 2);
}

#[test]
fn test_distant_version_is_a_sticky_fault() {
    let (_temp_dir, config) = test_config();
    seed_version(&config, -4_000_000_000_000_000_000);
    let db = Database::new(config).with_migrations(MigrationRegistry::new().register(5, 6, |_| Ok(())));
    let ctx = CallContext::background();

    let first = match db.ensure_ready(&ctx) {
        Err(StoreError::Incompatible(fault)) => fault,
        other => panic!("expected incompatible, got {other:?}"),
    };
    assert_eq!(first.found, -4_000_000_000_000_000_000);

    match db.ensure_ready(&ctx) {
        Err(StoreError::Incompatible(fault)) => assert_eq!(fault, first),
        other => panic!("expected cached fault, got {other:?}"),
    }
    assert_eq!(db.init_runs(), 1);
}
