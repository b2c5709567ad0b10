//! Core library for the shopping micro-service store.
//!
//! This crate brings a shared SQLite database to a known schema state exactly
//! once per process and runs units of work transactionally with retry on
//! contention. The rest of the service reaches it through two contracts:
//!
//! - [`Database::ensure_ready`] / [`Store::ensure_ready`]: the init gate.
//!   Connects, creates missing tables, validates the persisted schema
//!   version and, on a mismatch, dispatches a registered migration. An
//!   unresolvable mismatch is cached as a [`CompatibilityFault`].
//! - [`Database::execute_tx`] / [`Store::execute_tx`]: commits on success,
//!   rolls back on error, and re-runs the whole transaction when SQLite
//!   reports the database busy or locked.
//!
//! # Quick Start
//!
//! ```rust
//! use shopping_core::{CallContext, Database, DatabaseResultExt, StoreConfig};
//!
//! # fn example() -> shopping_core::Result<()> {
//! let db = Database::new(StoreConfig::default());
//! let ctx = CallContext::background();
//!
//! db.ensure_ready(&ctx)?;
//! let lists: i64 = db.execute_tx(&ctx, |tx| {
//!     tx.query_row("SELECT COUNT(*) FROM shopping_lists", [], |row| row.get(0))
//!         .db_context("count lists")
//! })?;
//! assert_eq!(lists, 0);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod db;
pub mod display;
pub mod error;
pub mod models;
pub mod params;
pub mod store;

// Re-export commonly used types
pub use config::{DataSource, RetryPolicy, StoreConfig};
pub use context::CallContext;
pub use db::{migrations::MigrationRegistry, version::SCHEMA_VERSION, Database};
pub use display::ShoppingLists;
pub use error::{CompatibilityFault, DatabaseResultExt, Result, StoreError};
pub use models::{InitState, ListMode, ListUpdate, ShoppingList, StoreStatus};
pub use store::{Store, StoreBuilder};
