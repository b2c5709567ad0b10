//! Transaction execution with contention retry.

use log::{debug, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    config::RetryPolicy,
    context::CallContext,
    error::{DatabaseResultExt, Result, StoreError},
};

/// Runs `work` inside a transaction on `conn`.
///
/// The transaction commits when `work` returns `Ok` and rolls back when it
/// returns `Err`, surfacing the original error. When either `work` or the
/// commit fails with a contention error the whole begin, work, commit
/// sequence is repeated, up to `policy` attempts, so `work` may run more
/// than once and must be safe to repeat with respect to anything outside
/// the transaction.
pub fn execute_tx<T, F>(
    conn: &mut Connection,
    policy: &RetryPolicy,
    ctx: &CallContext,
    mut work: F,
) -> Result<T>
where
    F: FnMut(&Transaction<'_>) -> Result<T>,
{
    retry_contended(policy, ctx, || run_once(conn, &mut work))
}

/// Calls `try_once` until it succeeds, fails with a non-contention error, or
/// `policy` runs out of attempts. Nothing is held across the backoff sleeps
/// beyond what `try_once` itself keeps.
pub fn retry_contended<T, A>(policy: &RetryPolicy, ctx: &CallContext, mut try_once: A) -> Result<T>
where
    A: FnMut() -> Result<T>,
{
    let attempts = policy.attempts();
    let mut attempt = 0;
    loop {
        ctx.check()?;
        attempt += 1;
        let err = match try_once() {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !err.is_retryable() {
            return Err(err);
        }
        if attempt >= attempts {
            warn!("Transaction gave up after {attempt} contended attempt(s): {err}");
            return Err(StoreError::RetriesExhausted {
                attempts: attempt,
                source: Box::new(err),
            });
        }
        let delay = policy.backoff(attempt);
        debug!("Transaction contended (attempt {attempt}/{attempts}), retrying in {delay:?}: {err}");
        ctx.sleep(delay)?;
    }
}

/// Runs one begin, work, commit sequence.
pub fn run_once<T, F>(conn: &mut Connection, work: &mut F) -> Result<T>
where
    F: FnMut(&Transaction<'_>) -> Result<T>,
{
    // IMMEDIATE takes the write lock up front so contention shows at begin.
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .db_context("begin transaction")?;

    match work(&tx) {
        Ok(value) => {
            tx.commit().map_err(|source| StoreError::Commit { source })?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                warn!("Rollback failed after error '{err}': {rollback_err}");
            }
            Err(err)
        }
    }
}
