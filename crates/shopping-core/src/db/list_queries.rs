//! Shopping list queries.
//!
//! The free functions take a plain connection so callers can compose them
//! inside their own units of work; the [`Database`](super::Database) methods
//! wrap each one in its own retried transaction.

use jiff::Timestamp;
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};

use super::{
    schema::{
        COL_CREATE_DATE, COL_ID, COL_MODE, COL_NAME, COL_UPDATE_DATE, COL_USER_ID,
        TBL_SHOPPING_LISTS,
    },
    utils::{check_rows_affected, col_desc},
};
use crate::{
    context::CallContext,
    error::{DatabaseResultExt, Result, StoreError},
    models::{ListMode, ListUpdate, ShoppingList},
};

fn list_columns() -> String {
    col_desc(&[
        COL_ID,
        COL_USER_ID,
        COL_NAME,
        COL_MODE,
        COL_CREATE_DATE,
        COL_UPDATE_DATE,
    ])
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Timestamp> {
    row.get::<_, String>(idx)?
        .parse::<Timestamp>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn build_list_from_row(row: &Row<'_>) -> rusqlite::Result<ShoppingList> {
    let mode_str: String = row.get(3)?;
    let mode = mode_str.parse::<ListMode>().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Invalid list mode: {mode_str}"),
            )),
        )
    })?;

    Ok(ShoppingList {
        id: row.get::<_, i64>(0)? as u64,
        user_id: row.get(1)?,
        name: row.get(2)?,
        mode,
        created_at: parse_timestamp(row, 4)?,
        updated_at: parse_timestamp(row, 5)?,
    })
}

/// SQLite integers are signed; reject values that would wrap.
fn sql_int(value: u64, field: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| StoreError::invalid_input(field, "exceeds the largest SQL integer"))
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(StoreError::invalid_input("name", "must not be empty"));
    }
    Ok(())
}

/// Inserts a list named `name` for `user_id`, or returns the existing list
/// of that name unchanged.
pub fn insert_list(
    conn: &Connection,
    user_id: &str,
    name: &str,
    mode: ListMode,
) -> Result<ShoppingList> {
    validate_name(name)?;
    if let Some(existing) = get_list_by_name(conn, user_id, name)? {
        return Ok(existing);
    }

    let now = Timestamp::now();
    let now_str = now.to_string();
    let sql = format!(
        "INSERT INTO {TBL_SHOPPING_LISTS} ({}) VALUES (?1, ?2, ?3, ?4, ?5)",
        col_desc(&[COL_USER_ID, COL_NAME, COL_MODE, COL_CREATE_DATE, COL_UPDATE_DATE])
    );
    check_rows_affected(
        conn.execute(&sql, params![user_id, name, mode.as_str(), &now_str, &now_str]),
        1,
        "shopping list",
    )?;

    Ok(ShoppingList {
        id: conn.last_insert_rowid() as u64,
        user_id: user_id.to_string(),
        name: name.to_string(),
        mode,
        created_at: now,
        updated_at: now,
    })
}

/// Retrieves a list by id, scoped to its owner.
pub fn get_list(conn: &Connection, user_id: &str, id: u64) -> Result<Option<ShoppingList>> {
    let sql = format!(
        "SELECT {} FROM {TBL_SHOPPING_LISTS} WHERE {COL_ID} = ?1 AND {COL_USER_ID} = ?2",
        list_columns()
    );
    conn.query_row(&sql, params![sql_int(id, "id")?, user_id], build_list_from_row)
        .optional()
        .db_context("query shopping list")
}

fn get_list_by_name(conn: &Connection, user_id: &str, name: &str) -> Result<Option<ShoppingList>> {
    let sql = format!(
        "SELECT {} FROM {TBL_SHOPPING_LISTS} WHERE {COL_USER_ID} = ?1 AND {COL_NAME} = ?2",
        list_columns()
    );
    conn.query_row(&sql, params![user_id, name], build_list_from_row)
        .optional()
        .db_context("query shopping list by name")
}

/// Applies `update` to the list `id` owned by `user_id`.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] when no such list exists for the user.
pub fn update_list(
    conn: &Connection,
    user_id: &str,
    id: u64,
    update: &ListUpdate,
) -> Result<ShoppingList> {
    if update.is_empty() {
        return Err(StoreError::invalid_input("update", "nothing to update"));
    }
    if let Some(name) = &update.name {
        validate_name(name)?;
    }
    let sql_id = sql_int(id, "id")?;

    let sql = format!(
        "UPDATE {TBL_SHOPPING_LISTS}
         SET {COL_NAME} = COALESCE(?1, {COL_NAME}),
             {COL_MODE} = COALESCE(?2, {COL_MODE}),
             {COL_UPDATE_DATE} = ?3
         WHERE {COL_ID} = ?4 AND {COL_USER_ID} = ?5"
    );
    check_rows_affected(
        conn.execute(
            &sql,
            params![
                update.name.as_deref(),
                update.mode.map(|m| m.as_str()),
                Timestamp::now().to_string(),
                sql_id,
                user_id,
            ],
        ),
        1,
        "shopping list",
    )?;

    get_list(conn, user_id, id)?.ok_or_else(|| StoreError::not_found("shopping list"))
}

/// Pages through a user's lists, oldest first.
pub fn list_lists(
    conn: &Connection,
    user_id: &str,
    offset: u64,
    count: u64,
) -> Result<Vec<ShoppingList>> {
    let sql = format!(
        "SELECT {} FROM {TBL_SHOPPING_LISTS} WHERE {COL_USER_ID} = ?1
         ORDER BY {COL_ID} LIMIT ?2 OFFSET ?3",
        list_columns()
    );
    let (count, offset) = (sql_int(count, "count")?, sql_int(offset, "offset")?);
    let mut stmt = conn.prepare(&sql).db_context("prepare shopping list query")?;
    let lists = stmt
        .query_map(params![user_id, count, offset], build_list_from_row)
        .db_context("query shopping lists")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .db_context("read shopping lists")?;

    if lists.is_empty() {
        return Err(StoreError::not_found("shopping lists"));
    }
    Ok(lists)
}

impl super::Database {
    /// Creates a shopping list if the user has none of that name.
    pub fn insert_shopping_list(
        &self,
        ctx: &CallContext,
        user_id: &str,
        name: &str,
        mode: ListMode,
    ) -> Result<ShoppingList> {
        self.execute_tx(ctx, |tx| insert_list(tx, user_id, name, mode))
    }

    /// Renames a list and/or switches its mode.
    pub fn update_shopping_list(
        &self,
        ctx: &CallContext,
        user_id: &str,
        id: u64,
        update: &ListUpdate,
    ) -> Result<ShoppingList> {
        self.execute_tx(ctx, |tx| update_list(tx, user_id, id, update))
    }

    /// Returns up to `count` of the user's lists after skipping `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the page is empty.
    pub fn shopping_lists(
        &self,
        ctx: &CallContext,
        user_id: &str,
        offset: u64,
        count: u64,
    ) -> Result<Vec<ShoppingList>> {
        self.execute_tx(ctx, |tx| list_lists(tx, user_id, offset, count))
    }
}
