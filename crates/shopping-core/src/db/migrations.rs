//! Version-to-version migration dispatch.
//!
//! Steps are registered either for an exact `(from, to)` pair or as
//! single-version hops (`v -> v + 1`) that chain. Whatever path is chosen
//! runs inside one transaction together with the version upsert, so a
//! failure leaves the database exactly as it was.

use std::{collections::BTreeMap, fmt};

use log::info;
use rusqlite::{Connection, Transaction};

use super::version::set_running_version;
use crate::error::{DatabaseResultExt, Result, StoreError};

/// A single migration step. It receives the open migration transaction and
/// must not commit or roll it back.
pub type MigrationStep = Box<dyn Fn(&Transaction<'_>) -> Result<()> + Send + Sync>;

/// Lookup table of migration steps keyed by `(from, to)`.
#[derive(Default)]
pub struct MigrationRegistry {
    steps: BTreeMap<(i64, i64), MigrationStep>,
}

impl fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.steps.keys()).finish()
    }
}

impl MigrationRegistry {
    /// An empty registry: every mismatch is unsupported.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `step` for migrating `from` to `to`, replacing any step
    /// already registered for that pair.
    pub fn register<F>(mut self, from: i64, to: i64, step: F) -> Self
    where
        F: Fn(&Transaction<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.steps.insert((from, to), Box::new(step));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Resolves the hops needed to get from `from` to `to`: the exact pair
    /// if registered, else a complete chain of single-version steps.
    pub fn path(&self, from: i64, to: i64) -> Result<Vec<(i64, i64)>> {
        if self.steps.contains_key(&(from, to)) {
            return Ok(vec![(from, to)]);
        }
        if from >= to {
            return Err(StoreError::UnsupportedMigration { from, to });
        }
        // Walk the gap lazily: a persisted version can sit arbitrarily far
        // from the expected one.
        if (from..to).all(|v| self.steps.contains_key(&(v, v + 1))) {
            Ok((from..to).map(|v| (v, v + 1)).collect())
        } else {
            Err(StoreError::UnsupportedMigration { from, to })
        }
    }

    /// Runs the migration path from `from` to `to` and records `to` as the
    /// persisted version, all in one transaction.
    pub fn migrate(&self, conn: &mut Connection, from: i64, to: i64) -> Result<()> {
        let path = self.path(from, to)?;
        let tx = conn.transaction().db_context("begin migration")?;
        for (hop_from, hop_to) in path {
            if let Some(step) = self.steps.get(&(hop_from, hop_to)) {
                step(&tx).map_err(|e| StoreError::Migration {
                    from: hop_from,
                    to: hop_to,
                    source: Box::new(e),
                })?;
                info!("Migrated schema from version {hop_from} to {hop_to}");
            }
        }
        set_running_version(&tx, to)?;
        tx.commit().db_context("commit migration")?;
        Ok(())
    }
}
