//! Display implementations for domain models.

use std::fmt;

use super::datetime::ZonedStamp;
use crate::models::{InitState, ListMode, ShoppingList, StoreStatus};

impl fmt::Display for ListMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for InitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitState::Uninitialized => write!(f, "uninitialized"),
            InitState::Ready => write!(f, "ready"),
            InitState::Incompatible(fault) => write!(f, "incompatible: {fault}"),
        }
    }
}

impl fmt::Display for ShoppingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "### {}. {} ({})", self.id, self.name, self.mode)?;
        writeln!(f)?;
        writeln!(f, "- Owner: {}", self.user_id)?;
        writeln!(f, "- Created: {}", ZonedStamp::local(&self.created_at))?;
        writeln!(f, "- Updated: {}", ZonedStamp::local(&self.updated_at))?;
        Ok(())
    }
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Store {}", self.db_name)?;
        writeln!(f)?;
        writeln!(f, "- Data source: {}", self.data_source)?;
        if !self.database_exists {
            writeln!(f, "- Database: not created yet")?;
        }
        writeln!(f, "- State: {}", self.state)?;
        writeln!(f, "- Expected schema version: {}", self.expected_version)?;
        match &self.persisted {
            Some(persisted) => writeln!(
                f,
                "- Persisted schema version: {} (updated {})",
                persisted.version,
                ZonedStamp::local(&persisted.updated_at)
            )?,
            None => writeln!(f, "- Persisted schema version: none")?,
        }
        Ok(())
    }
}

/// Newtype for rendering a page of shopping lists.
pub struct ShoppingLists(pub Vec<ShoppingList>);

impl fmt::Display for ShoppingLists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No shopping lists found.");
        }
        writeln!(f, "# Shopping Lists")?;
        writeln!(f)?;
        for list in &self.0 {
            write!(f, "{list}")?;
            writeln!(f)?;
        }
        Ok(())
    }
}
