//! Parameter structures for store operations.
//!
//! These carry no framework derives beyond serde, so an HTTP layer or the CLI
//! can wrap them with their own argument types and convert with `.into()`.

use serde::{Deserialize, Serialize};

use crate::models::ListMode;

/// Default page size for listing operations.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Parameters for creating a shopping list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateList {
    /// Owner of the list
    pub user_id: String,
    /// Name, unique per user
    pub name: String,
    /// Initial mode; `PREPARATION` when absent
    pub mode: Option<ListMode>,
}

/// Parameters for updating a shopping list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateList {
    pub user_id: String,
    /// ID of the list to update
    pub id: u64,
    /// New name
    pub name: Option<String>,
    /// New mode
    pub mode: Option<ListMode>,
}

/// Parameters for paging through a user's shopping lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListLists {
    pub user_id: String,
    #[serde(default)]
    pub offset: u64,
    #[serde(default = "default_count")]
    pub count: u64,
}

fn default_count() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl ListLists {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            offset: 0,
            count: DEFAULT_PAGE_SIZE,
        }
    }
}
