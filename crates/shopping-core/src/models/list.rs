//! Shopping lists.

use std::str::FromStr;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// What the client apps are doing with a list right now.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListMode {
    /// The list is being drawn up
    #[default]
    Preparation,

    /// The user is in a store working through the list
    Shopping,
}

impl FromStr for ListMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PREPARATION" => Ok(ListMode::Preparation),
            "SHOPPING" => Ok(ListMode::Shopping),
            _ => Err(format!("Invalid list mode: {s}")),
        }
    }
}

impl ListMode {
    /// Database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ListMode::Preparation => "PREPARATION",
            ListMode::Shopping => "SHOPPING",
        }
    }
}

/// A user's named shopping list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShoppingList {
    pub id: u64,
    pub user_id: String,
    pub name: String,
    pub mode: ListMode,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Fields to change on an existing list. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListUpdate {
    pub name: Option<String>,
    pub mode: Option<ListMode>,
}

impl ListUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.mode.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parses_case_insensitively() {
        assert_eq!("shopping".parse::<ListMode>(), Ok(ListMode::Shopping));
        assert_eq!("PREPARATION".parse::<ListMode>(), Ok(ListMode::Preparation));
        assert!("cooking".parse::<ListMode>().is_err());
    }

    #[test]
    fn test_mode_serializes_uppercase() {
        let json = serde_json::to_string(&ListMode::Shopping).expect("serialize");
        assert_eq!(json, "\"SHOPPING\"");
    }
}
