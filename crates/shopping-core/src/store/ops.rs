//! Async store operations.

use rusqlite::Transaction;

use super::Store;
use crate::{
    error::Result,
    models::{ListUpdate, ShoppingList, StoreStatus},
    params::{CreateList, ListLists, UpdateList},
};

impl Store {
    /// Ensures the store is initialized; see
    /// [`Database::ensure_ready`](crate::db::Database::ensure_ready).
    pub async fn ensure_ready(&self) -> Result<()> {
        self.blocking(|db, ctx| db.ensure_ready(ctx)).await
    }

    /// Runs `work` transactionally; see
    /// [`Database::execute_tx`](crate::db::Database::execute_tx).
    ///
    /// `work` may run more than once when the transaction hits contention.
    pub async fn execute_tx<T, F>(&self, work: F) -> Result<T>
    where
        F: FnMut(&Transaction<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.blocking(move |db, ctx| db.execute_tx(ctx, work)).await
    }

    /// Reports gate state and persisted schema version.
    pub async fn status(&self) -> Result<StoreStatus> {
        self.blocking(|db, ctx| db.status(ctx)).await
    }

    /// Creates a shopping list, or returns the user's existing list of the
    /// same name.
    pub async fn create_list(&self, params: &CreateList) -> Result<ShoppingList> {
        let user_id = params.user_id.clone();
        let name = params.name.clone();
        let mode = params.mode.unwrap_or_default();

        self.blocking(move |db, ctx| db.insert_shopping_list(ctx, &user_id, &name, mode))
            .await
    }

    /// Updates a shopping list's name and/or mode.
    pub async fn update_list(&self, params: &UpdateList) -> Result<ShoppingList> {
        let user_id = params.user_id.clone();
        let id = params.id;
        let update = ListUpdate {
            name: params.name.clone(),
            mode: params.mode,
        };

        self.blocking(move |db, ctx| db.update_shopping_list(ctx, &user_id, id, &update))
            .await
    }

    /// Pages through a user's shopping lists.
    pub async fn lists(&self, params: &ListLists) -> Result<Vec<ShoppingList>> {
        let user_id = params.user_id.clone();
        let (offset, count) = (params.offset, params.count);

        self.blocking(move |db, ctx| db.shopping_lists(ctx, &user_id, offset, count))
            .await
    }
}
