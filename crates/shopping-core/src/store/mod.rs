//! Async store API.
//!
//! [`Store`] is the handle the rest of the service holds. It shares one
//! [`Database`] across all callers and runs every blocking call on tokio's
//! blocking pool, so request handlers can await store work without stalling
//! the runtime.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │    Handlers     │    │      Store      │    │    Database     │
//! │  (HTTP / CLI)   │───▶│ (spawn_blocking)│───▶│ (gate + tx exec)│
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use shopping_core::{params::CreateList, StoreBuilder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = StoreBuilder::new().in_memory().build()?;
//! store.ensure_ready().await?;
//!
//! let list = store
//!     .create_list(&CreateList {
//!         user_id: "user-1".to_string(),
//!         name: "Groceries".to_string(),
//!         mode: None,
//!     })
//!     .await?;
//! println!("{list}");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::task;
use tokio_util::sync::CancellationToken;

use crate::{
    context::CallContext,
    db::Database,
    error::{Result, StoreError},
};

pub mod builder;
pub mod ops;


pub use builder::StoreBuilder;

/// Cloneable async handle over a shared [`Database`].
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
    ctx: CallContext,
    shutdown: CancellationToken,
}

impl Store {
    pub(crate) fn new(db: Database, ctx: CallContext) -> Self {
        Self {
            db: Arc::new(db),
            shutdown: ctx.token().clone(),
            ctx,
        }
    }

    /// A handle on the same database whose calls run under `ctx`, typically
    /// a request's deadline or cancellation token. Shutting the store down
    /// still cancels them.
    ///
    /// ```rust
    /// use std::time::Duration;
    ///
    /// use shopping_core::{CallContext, StoreBuilder};
    ///
    /// # async fn example() -> shopping_core::Result<()> {
    /// let store = StoreBuilder::new().in_memory().build()?;
    /// let request = store.with_context(CallContext::with_timeout(Duration::from_secs(2)));
    /// request.ensure_ready().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_context(&self, ctx: CallContext) -> Store {
        Self {
            db: Arc::clone(&self.db),
            ctx: ctx.within(&self.shutdown),
            shutdown: self.shutdown.clone(),
        }
    }

    /// The underlying synchronous handle.
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Cancels in-flight and future blocking work on this store and every
    /// handle derived from it, e.g. on shutdown.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Runs `f` on the blocking pool with the shared database and context.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database, &CallContext) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let ctx = self.ctx.clone();
        task::spawn_blocking(move || f(&db, &ctx))
            .await
            .map_err(|e| StoreError::Configuration {
                message: format!("Task join error: {e}"),
            })?
    }
}
