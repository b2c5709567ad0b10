//! Column-list formatting and affected-row checks shared by queries.

use crate::error::{Result, StoreError};

/// Joins `cols` in order with `", "`, skipping empty names.
///
/// ```
/// use shopping_core::db::utils::col_desc;
///
/// assert_eq!(col_desc(&["key", "", "value"]), "key, value");
/// ```
pub fn col_desc(cols: &[&str]) -> String {
    cols.iter()
        .filter(|col| !col.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}

/// Verifies that a write touched exactly `expected` rows.
///
/// Zero rows (or a `QueryReturnedNoRows` from the driver) is a
/// [`StoreError::NotFound`]; any other mismatch is
/// [`StoreError::RowCount`].
pub fn check_rows_affected(
    result: rusqlite::Result<usize>,
    expected: usize,
    what: &str,
) -> Result<()> {
    let affected = match result {
        Ok(affected) => affected,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Err(StoreError::not_found(what)),
        Err(e) => return Err(StoreError::database(format!("write {what}")).with_source(e)),
    };
    if affected == 0 {
        return Err(StoreError::not_found(format!("{what} for update")));
    }
    if affected != expected {
        return Err(StoreError::RowCount {
            expected,
            actual: affected,
        });
    }
    Ok(())
}
